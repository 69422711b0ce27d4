//! fbpush
//!
//! Decodes an image, converts it to RGB565, and writes it to a Linux
//! framebuffer device.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use fbpush_hw::{convert, Error, Session};
use image::DynamicImage;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "fbpush")]
#[command(about = "Push images to a Linux framebuffer device")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Framebuffer device path
    #[arg(long, default_value = fbpush_hw::DEFAULT_DEVICE)]
    device: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an image and write it to the display
    Show {
        /// Path to the source image (PNG, JPEG, ...)
        image: PathBuf,
    },
    /// Fill the display with a solid color
    Fill {
        /// Color in hex format (e.g., #FF0000 for red)
        #[arg(default_value = "#000000")]
        color: String,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt().with_env_filter(filter).init();

    match cli.command {
        Commands::Show { image } => handle_show(&image, &cli.device),
        Commands::Fill { color } => handle_fill(&color, &cli.device),
    }
}

fn handle_show(path: &Path, device: &str) -> Result<()> {
    let decoded = image::open(path)
        .with_context(|| format!("Failed to decode image: {}", path.display()))?;
    debug!(
        "decoded {} as {:?}, {} x {}",
        path.display(),
        decoded.color(),
        decoded.width(),
        decoded.height()
    );

    let argb = argb_words(&decoded)?;
    let pixels = fbpush_hw::argb32_buffer_to_rgb565(&argb);
    push_frame(device, &fbpush_hw::rgb565_bytes(&pixels))?;

    println!(
        "Wrote {} ({} x {}) to {}",
        path.display(),
        decoded.width(),
        decoded.height(),
        device
    );
    Ok(())
}

fn handle_fill(color: &str, device: &str) -> Result<()> {
    let rgb565 = convert::parse_hex_color(color)
        .with_context(|| format!("Invalid hex color: {}", color))?;

    let mut session = Session::open(device)?;
    let geometry = session.geometry();
    let pixels = vec![rgb565; geometry.width as usize * geometry.height as usize];
    session.update(&fbpush_hw::rgb565_bytes(&pixels))?;
    session.close();

    println!("Filled {} with {}", device, color);
    Ok(())
}

/// Assembles ARGB32 words from a decoded image.
///
/// Accepts 8-bit RGBA and RGB decodes; anything else (16-bit, grayscale)
/// is rejected rather than silently truncated.
fn argb_words(decoded: &DynamicImage) -> Result<Vec<u32>> {
    let words = match decoded {
        DynamicImage::ImageRgba8(img) => img
            .pixels()
            .map(|p| {
                let [r, g, b, a] = p.0;
                pack_argb(a, r, g, b)
            })
            .collect(),
        DynamicImage::ImageRgb8(img) => img
            .pixels()
            .map(|p| {
                let [r, g, b] = p.0;
                pack_argb(0xFF, r, g, b)
            })
            .collect(),
        other => {
            return Err(Error::UnsupportedPixelFormat(format!("{:?}", other.color())).into());
        }
    };
    Ok(words)
}

fn pack_argb(a: u8, r: u8, g: u8, b: u8) -> u32 {
    (u32::from(a) << 24) | (u32::from(r) << 16) | (u32::from(g) << 8) | u32::from(b)
}

fn push_frame(device: &str, frame: &[u8]) -> Result<()> {
    let mut session = Session::open(device)?;
    session.update(frame)?;
    session.close();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    #[test]
    fn test_argb_words_from_rgba() {
        let mut img = RgbaImage::new(2, 1);
        img.put_pixel(0, 0, Rgba([0xF8, 0x00, 0x00, 0xFF]));
        img.put_pixel(1, 0, Rgba([0xFF, 0xFF, 0xFF, 0x00]));

        let words = argb_words(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(words, vec![0xFFF8_0000, 0x00FF_FFFF]);
    }

    #[test]
    fn test_argb_words_rejects_luma() {
        let img = DynamicImage::ImageLuma8(image::GrayImage::new(1, 1));
        let err = argb_words(&img).unwrap_err();
        assert!(err.to_string().contains("unsupported pixel format"));
    }

    #[test]
    fn test_pack_argb() {
        assert_eq!(pack_argb(0xFF, 0x12, 0x34, 0x56), 0xFF12_3456);
    }
}
