//! PNG decoding and image XObject data.

use anyhow::{Context, Result};
use image::{DynamicImage, ImageFormat, ImageReader};
use log::debug;
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceGray,
    DeviceRgb,
}

impl ColorSpace {
    pub fn pdf_name(&self) -> &'static str {
        match self {
            ColorSpace::DeviceGray => "DeviceGray",
            ColorSpace::DeviceRgb => "DeviceRGB",
        }
    }
}

/// A decoded raster with flate-compressed samples, ready to become an
/// image XObject.
#[derive(Debug, Clone)]
pub struct BitmapResource {
    pub width: u32,
    pub height: u32,
    pub color_space: ColorSpace,
    /// 8 bits per component, zlib compressed
    pub samples: Vec<u8>,
    /// 8-bit soft mask, present only when some pixel is not fully opaque
    pub alpha: Option<Vec<u8>>,
}

impl BitmapResource {
    pub fn from_image(img: &DynamicImage) -> Result<Self> {
        let rgba = img.to_rgba8();
        let (width, height) = rgba.dimensions();

        let gray = rgba.pixels().all(|p| p[0] == p[1] && p[1] == p[2]);
        let opaque = rgba.pixels().all(|p| p[3] == u8::MAX);

        let raw: Vec<u8> = if gray {
            rgba.pixels().map(|p| p[0]).collect()
        } else {
            rgba.pixels().flat_map(|p| [p[0], p[1], p[2]]).collect()
        };
        let samples = compress_data(&raw)?;

        let alpha = if opaque {
            None
        } else {
            let raw_alpha: Vec<u8> = rgba.pixels().map(|p| p[3]).collect();
            Some(compress_data(&raw_alpha)?)
        };

        Ok(Self {
            width,
            height,
            color_space: if gray {
                ColorSpace::DeviceGray
            } else {
                ColorSpace::DeviceRgb
            },
            samples,
            alpha,
        })
    }
}

/// Decode the PNG at `path`
pub fn load_bitmap(path: &Path) -> Result<BitmapResource> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open code image at {:?}", path))?;
    let img = ImageReader::with_format(BufReader::new(file), ImageFormat::Png)
        .decode()
        .with_context(|| format!("Failed to decode PNG {:?}", path))?;

    let bitmap = BitmapResource::from_image(&img)?;
    debug!(
        "Decoded {:?}: {}x{} {:?}{}",
        path,
        bitmap.width,
        bitmap.height,
        bitmap.color_space,
        if bitmap.alpha.is_some() { " with alpha" } else { "" }
    );
    Ok(bitmap)
}

/// Compress data using zlib/flate2
pub fn compress_data(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = flate2::write::ZlibEncoder::new(Vec::new(), flate2::Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::ZlibDecoder;
    use image::{Rgb, RgbImage, Rgba, RgbaImage};
    use std::io::Read;

    fn decompress(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        ZlibDecoder::new(data).read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn test_gray_image_uses_device_gray() {
        let img = RgbImage::from_fn(4, 2, |x, _| if x % 2 == 0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) });
        let bitmap = BitmapResource::from_image(&DynamicImage::ImageRgb8(img)).unwrap();
        assert_eq!(bitmap.color_space, ColorSpace::DeviceGray);
        assert_eq!((bitmap.width, bitmap.height), (4, 2));
        assert!(bitmap.alpha.is_none());
        assert_eq!(decompress(&bitmap.samples), vec![0, 255, 0, 255, 0, 255, 0, 255]);
    }

    #[test]
    fn test_color_image_with_alpha() {
        let img = RgbaImage::from_pixel(3, 3, Rgba([200, 10, 10, 128]));
        let bitmap = BitmapResource::from_image(&DynamicImage::ImageRgba8(img)).unwrap();
        assert_eq!(bitmap.color_space, ColorSpace::DeviceRgb);
        assert_eq!(decompress(&bitmap.samples).len(), 27);
        assert_eq!(decompress(bitmap.alpha.as_ref().unwrap()), vec![128; 9]);
    }

    #[test]
    fn test_load_bitmap_from_png_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.png");
        RgbaImage::from_pixel(10, 20, Rgba([0, 0, 0, 255])).save(&path).unwrap();

        let bitmap = load_bitmap(&path).unwrap();
        assert_eq!((bitmap.width, bitmap.height), (10, 20));
        assert_eq!(bitmap.color_space, ColorSpace::DeviceGray);
    }

    #[test]
    fn test_load_bitmap_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_bitmap(&dir.path().join("absent.png")).unwrap_err();
        assert!(err.to_string().contains("Failed to open code image"));
    }

    #[test]
    fn test_load_bitmap_rejects_non_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("code.png");
        std::fs::write(&path, b"definitely not a png").unwrap();
        let err = load_bitmap(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to decode PNG"));
    }

    #[test]
    fn test_compress_data_round_trips() {
        let data = b"hello hello hello hello".to_vec();
        assert_eq!(decompress(&compress_data(&data).unwrap()), data);
    }
}
