//! Memory-mapped framebuffer device session.

use std::fs::{File, OpenOptions};
use std::os::fd::AsRawFd;
use std::path::Path;

use tracing::{debug, info};

use crate::{Error, Result};

// linux/fb.h ioctl requests and structs; the libc crate does not bind them.
const FBIOGET_VSCREENINFO: libc::c_ulong = 0x4600;
const FBIOGET_FSCREENINFO: libc::c_ulong = 0x4602;

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct FbBitfield {
    offset: u32,
    length: u32,
    msb_right: u32,
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct FbVarScreeninfo {
    xres: u32,
    yres: u32,
    xres_virtual: u32,
    yres_virtual: u32,
    xoffset: u32,
    yoffset: u32,
    bits_per_pixel: u32,
    grayscale: u32,
    red: FbBitfield,
    green: FbBitfield,
    blue: FbBitfield,
    transp: FbBitfield,
    nonstd: u32,
    activate: u32,
    height: u32,
    width: u32,
    accel_flags: u32,
    pixclock: u32,
    left_margin: u32,
    right_margin: u32,
    upper_margin: u32,
    lower_margin: u32,
    hsync_len: u32,
    vsync_len: u32,
    sync: u32,
    vmode: u32,
    rotate: u32,
    colorspace: u32,
    reserved: [u32; 4],
}

#[repr(C)]
#[derive(Clone, Copy)]
#[allow(dead_code)]
struct FbFixScreeninfo {
    id: [u8; 16],
    smem_start: libc::c_ulong,
    smem_len: u32,
    type_: u32,
    type_aux: u32,
    visual: u32,
    xpanstep: u16,
    ypanstep: u16,
    ywrapstep: u16,
    line_length: u32,
    mmio_start: libc::c_ulong,
    mmio_len: u32,
    accel: u32,
    capabilities: u16,
    reserved: [u16; 2],
}

/// Display geometry reported by the device.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    /// Visible width in pixels.
    pub width: u32,
    /// Visible height in pixels.
    pub height: u32,
    /// Bits per pixel (16 for RGB565 devices).
    pub bits_per_pixel: u32,
}

impl Geometry {
    /// Byte length of one full frame.
    pub fn frame_len(&self) -> usize {
        self.width as usize * self.height as usize * (self.bits_per_pixel as usize / 8)
    }
}

/// The device's mapped memory region.
#[derive(Debug)]
struct Mapping {
    ptr: *mut u8,
    len: usize,
}

/// An open framebuffer device session.
///
/// Owns the device file descriptor and the single mapped memory region.
/// The session is move-only; [`close`](Session::close) (or dropping the
/// session) unmaps the region and releases the descriptor, and a second
/// close is a no-op.
#[derive(Debug)]
pub struct Session {
    file: Option<File>,
    map: Option<Mapping>,
    geometry: Geometry,
}

impl Session {
    /// Opens a framebuffer device and maps its memory.
    ///
    /// Queries fixed screen info for the mappable memory length and
    /// variable screen info for the display geometry, then maps the full
    /// reported length read/write shared. If the mapping fails the
    /// descriptor is released before the error returns.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(path)
            .map_err(|source| Error::DeviceUnavailable {
                path: path.display().to_string(),
                source,
            })?;
        let fd = file.as_raw_fd();

        let mut finfo: FbFixScreeninfo = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(fd, FBIOGET_FSCREENINFO as _, &mut finfo) } != 0 {
            return Err(Error::DeviceQueryFailed(std::io::Error::last_os_error()));
        }

        let mut vinfo: FbVarScreeninfo = unsafe { std::mem::zeroed() };
        if unsafe { libc::ioctl(fd, FBIOGET_VSCREENINFO as _, &mut vinfo) } != 0 {
            return Err(Error::DeviceQueryFailed(std::io::Error::last_os_error()));
        }

        let geometry = Geometry {
            width: vinfo.xres,
            height: vinfo.yres,
            bits_per_pixel: vinfo.bits_per_pixel,
        };
        info!(
            "framebuffer display is {} x {} {}bpp",
            geometry.width, geometry.height, geometry.bits_per_pixel
        );

        let len = finfo.smem_len as usize;
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_SHARED,
                fd,
                0,
            )
        };
        if ptr == libc::MAP_FAILED {
            // `file` drops here, so the descriptor is not leaked
            return Err(Error::MappingFailed(std::io::Error::last_os_error()));
        }

        Ok(Self {
            file: Some(file),
            map: Some(Mapping {
                ptr: ptr.cast(),
                len,
            }),
            geometry,
        })
    }

    /// Returns the display geometry.
    pub fn geometry(&self) -> Geometry {
        self.geometry
    }

    /// Writes one full frame into the mapped region, starting at offset 0.
    ///
    /// `frame` must hold at least `width * height * bits_per_pixel / 8`
    /// bytes; shorter input fails with [`Error::BufferTooSmall`] before
    /// anything is copied.
    pub fn update(&mut self, frame: &[u8]) -> Result<()> {
        let map = self.map.as_ref().ok_or(Error::SessionClosed)?;
        let expected = self.geometry.frame_len();
        if frame.len() < expected {
            return Err(Error::BufferTooSmall {
                expected,
                actual: frame.len(),
            });
        }

        // A frame never exceeds smem_len on a sane driver; clamp anyway so
        // the copy stays inside the mapping.
        let count = expected.min(map.len);
        unsafe {
            std::ptr::copy_nonoverlapping(frame.as_ptr(), map.ptr, count);
        }
        debug!("wrote {} byte frame", count);
        Ok(())
    }

    /// Unmaps the device memory and releases the descriptor.
    ///
    /// Calling close on an already closed session is a no-op.
    pub fn close(&mut self) {
        if let Some(map) = self.map.take() {
            unsafe {
                libc::munmap(map.ptr.cast(), map.len);
            }
            debug!("framebuffer unmapped");
        }
        // Dropping the file closes the descriptor
        self.file.take();
    }

    /// Builds a session over an anonymous mapping instead of a device,
    /// so the update/close paths can be exercised without hardware.
    #[cfg(test)]
    fn with_anonymous_mapping(geometry: Geometry) -> Session {
        let len = geometry.frame_len();
        let ptr = unsafe {
            libc::mmap(
                std::ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        assert_ne!(ptr, libc::MAP_FAILED);
        Session {
            file: None,
            map: Some(Mapping {
                ptr: ptr.cast(),
                len,
            }),
            geometry,
        }
    }

    #[cfg(test)]
    fn mapped_bytes(&self) -> &[u8] {
        let map = self.map.as_ref().unwrap();
        unsafe { std::slice::from_raw_parts(map.ptr, map.len) }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_missing_device() {
        let err = Session::open("/dev/fb-does-not-exist").unwrap_err();
        assert!(matches!(err, Error::DeviceUnavailable { .. }));
    }

    #[test]
    fn test_frame_len() {
        let geometry = Geometry {
            width: 480,
            height: 320,
            bits_per_pixel: 16,
        };
        assert_eq!(geometry.frame_len(), 480 * 320 * 2);
    }

    fn test_geometry() -> Geometry {
        Geometry {
            width: 4,
            height: 2,
            bits_per_pixel: 16,
        }
    }

    #[test]
    fn test_update_short_buffer_copies_nothing() {
        let mut session = Session::with_anonymous_mapping(test_geometry());
        let frame_len = session.geometry().frame_len();

        let short = vec![0xAAu8; frame_len - 1];
        assert!(matches!(
            session.update(&short),
            Err(Error::BufferTooSmall { expected, actual })
                if expected == frame_len && actual == frame_len - 1
        ));
        // Anonymous mappings start zeroed; the failed update must not
        // have touched them
        assert!(session.mapped_bytes().iter().all(|&b| b == 0));
    }

    #[test]
    fn test_update_writes_full_frame() {
        let mut session = Session::with_anonymous_mapping(test_geometry());
        let frame = vec![0x5Au8; session.geometry().frame_len()];

        session.update(&frame).unwrap();
        assert_eq!(session.mapped_bytes(), frame.as_slice());
    }

    #[test]
    fn test_close_is_idempotent() {
        let mut session = Session::with_anonymous_mapping(test_geometry());
        let frame = vec![0u8; session.geometry().frame_len()];

        session.close();
        session.close();
        assert!(matches!(session.update(&frame), Err(Error::SessionClosed)));
    }

    // Hardware tests are skipped by default
    #[test]
    #[ignore]
    fn test_device_lifecycle() {
        let mut session = Session::open(crate::DEFAULT_DEVICE).unwrap();
        let frame_len = session.geometry().frame_len();

        let short = vec![0u8; frame_len - 1];
        assert!(matches!(
            session.update(&short),
            Err(Error::BufferTooSmall { .. })
        ));

        let frame = vec![0u8; frame_len];
        session.update(&frame).unwrap();

        session.close();
        session.close();
        assert!(matches!(session.update(&frame), Err(Error::SessionClosed)));
    }
}
