//! fbpush Hardware Library
//!
//! Provides direct access to Linux framebuffer devices (`/dev/fbN`) via
//! mmap, plus pixel format conversion from ARGB32 to RGB565.

pub mod convert;
pub mod error;
pub mod session;

pub use convert::{argb32_buffer_to_rgb565, argb32_to_rgb565, rgb565_bytes};
pub use error::{Error, Result};
pub use session::{Geometry, Session};

/// Default framebuffer device for the secondary display.
pub const DEFAULT_DEVICE: &str = "/dev/fb1";
