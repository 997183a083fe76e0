//! Writes code-med-high.png, the QR code stamped on every card.
//!
//! Run with `cargo run --example make_code_image [URL]` from the directory
//! where `bcard` will be run.

use anyhow::{Context, Result};
use image::Luma;
use qrcode::{EcLevel, QrCode};

const DEFAULT_URL: &str = "http://alex.willisson.org";

/// Pixels per module; at the 0.1 scale used on the card this gives 1pt modules
const MODULE_PIXELS: u32 = 10;

fn main() -> Result<()> {
    let url = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_URL.to_string());

    // Level Q recovers ~25% damage, between medium (M) and high (H)
    let code = QrCode::with_error_correction_level(url.as_bytes(), EcLevel::Q)
        .with_context(|| format!("Failed to generate QR code for data: {}", url))?;

    let img = code
        .render::<Luma<u8>>()
        .light_color(Luma([255u8]))
        .dark_color(Luma([0u8]))
        .module_dimensions(MODULE_PIXELS, MODULE_PIXELS)
        .build();

    img.save("code-med-high.png")
        .with_context(|| "Failed to write code-med-high.png")?;
    println!("Created code-med-high.png ({}x{})", img.width(), img.height());
    Ok(())
}
