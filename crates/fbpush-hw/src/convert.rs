//! ARGB32 to RGB565 pixel conversion.
//!
//! The target display takes 16-bit pixels with red in bits 15-11, green in
//! bits 10-5 and blue in bits 4-0. Conversion keeps the top 5/6/5 bits of
//! each 8-bit channel and discards alpha entirely, so it is lossy and
//! one-way.

/// Top 5 bits of the red channel in an ARGB32 word.
pub const ARGB_RED_MASK: u32 = 0x00F8_0000;
/// Top 6 bits of the green channel in an ARGB32 word.
pub const ARGB_GREEN_MASK: u32 = 0x0000_FC00;
/// Top 5 bits of the blue channel in an ARGB32 word.
pub const ARGB_BLUE_MASK: u32 = 0x0000_00F8;

/// Right shift moving the masked red bits into RGB565 positions 15-11.
pub const RED_SHIFT: u32 = 8;
/// Right shift moving the masked green bits into RGB565 positions 10-5.
pub const GREEN_SHIFT: u32 = 5;
/// Right shift moving the masked blue bits into RGB565 positions 4-0.
pub const BLUE_SHIFT: u32 = 3;

/// Converts a single ARGB32 pixel to RGB565.
#[inline]
pub fn argb32_to_rgb565(pixel: u32) -> u16 {
    let r = (pixel & ARGB_RED_MASK) >> RED_SHIFT;
    let g = (pixel & ARGB_GREEN_MASK) >> GREEN_SHIFT;
    let b = (pixel & ARGB_BLUE_MASK) >> BLUE_SHIFT;
    (r | g | b) as u16
}

/// Converts a buffer of ARGB32 pixels to RGB565, preserving pixel order
/// and count.
pub fn argb32_buffer_to_rgb565(src: &[u32]) -> Vec<u16> {
    src.iter().map(|&px| argb32_to_rgb565(px)).collect()
}

/// Returns the native-endian byte representation of an RGB565 pixel buffer,
/// suitable for writing straight into the mapped device memory.
pub fn rgb565_bytes(pixels: &[u16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(pixels.len() * 2);
    for &px in pixels {
        bytes.extend_from_slice(&px.to_ne_bytes());
    }
    bytes
}

/// Parses a hex color string to RGB565.
pub fn parse_hex_color(hex: &str) -> Option<u16> {
    let hex = hex.trim_start_matches('#');
    if hex.len() != 6 {
        return None;
    }
    let rgb = u32::from_str_radix(hex, 16).ok()?;
    Some(argb32_to_rgb565(0xFF00_0000 | rgb))
}
