//! Error types for the fbpush hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the framebuffer.
#[derive(Error, Debug)]
pub enum Error {
    /// Framebuffer device could not be opened.
    #[error("unable to open framebuffer device {path}: {source}")]
    DeviceUnavailable {
        path: String,
        source: std::io::Error,
    },

    /// Screen info ioctl failed.
    #[error("unable to query framebuffer geometry: {0}")]
    DeviceQueryFailed(std::io::Error),

    /// mmap of the device memory failed.
    #[error("unable to map framebuffer memory: {0}")]
    MappingFailed(std::io::Error),

    /// Supplied frame is shorter than one full device frame.
    #[error("frame buffer too small: expected at least {expected} bytes, got {actual}")]
    BufferTooSmall { expected: usize, actual: usize },

    /// Decoded image is not in a format we can convert.
    #[error("unsupported pixel format: {0}")]
    UnsupportedPixelFormat(String),

    /// Operation on a session that has already been closed.
    #[error("framebuffer session is closed")]
    SessionClosed,
}
