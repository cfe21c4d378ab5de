// Image loading module
// Decodes the image file and prepares the pixels for the X server.

use anyhow::{Context, Result};
use image::imageops::FilterType;
use image::DynamicImage;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Decoded image ready for upload to the server.
#[derive(Debug, Clone)]
pub struct ImageData {
    /// Natural (unscaled) width in pixels
    pub natural_width: u32,
    /// Natural (unscaled) height in pixels
    pub natural_height: u32,
    /// Width after scaling
    pub width: u32,
    /// Height after scaling
    pub height: u32,
    /// Premultiplied BGRA pixel data, 4 bytes per pixel
    pub pixels: Vec<u8>,
}

/// Load an image from a file and scale it once. Every later redraw reuses
/// these pixels unchanged, so repeated draws are automatically consistent.
pub fn load_image(path: &Path, scale: f64) -> Result<ImageData> {
    let data = fs::read(path)
        .with_context(|| format!("error reading file: {}", path.display()))?;
    let img = load_from_bytes(&data)
        .with_context(|| format!("error reading file: {}", path.display()))?;

    let natural_width = img.width();
    let natural_height = img.height();

    let width = scaled_dimension(natural_width, scale);
    let height = scaled_dimension(natural_height, scale);

    let img = if (scale - 1.0).abs() > f64::EPSILON {
        img.resize_exact(width, height, FilterType::Lanczos3)
    } else {
        img
    };

    // Convert to the 32-bit format a depth-32 X visual expects: BGRA byte
    // order (little-endian ARGB) with the colour channels premultiplied by
    // alpha, which is how compositors interpret ARGB32 pixels.
    let rgba = img.to_rgba8();
    let mut pixels = rgba.into_raw();
    for pixel in pixels.chunks_exact_mut(4) {
        premultiply_bgra(pixel);
    }

    Ok(ImageData {
        natural_width,
        natural_height,
        width,
        height,
        pixels,
    })
}

/// Window and pixel dimensions are `round(natural * scale)`.
pub fn scaled_dimension(natural: u32, scale: f64) -> u32 {
    (natural as f64 * scale).round() as u32
}

/// Load an image from raw bytes, auto-detecting the format
fn load_from_bytes(data: &[u8]) -> Result<DynamicImage> {
    let format = image::guess_format(data).context("failed to detect image format")?;
    let img = image::load(Cursor::new(data), format).context("failed to decode image")?;
    Ok(img)
}

/// Convert one RGBA pixel to premultiplied BGRA in place.
fn premultiply_bgra(pixel: &mut [u8]) {
    let a = pixel[3] as u32;
    let r = (pixel[0] as u32 * a / 255) as u8;
    let g = (pixel[1] as u32 * a / 255) as u8;
    let b = (pixel[2] as u32 * a / 255) as u8;
    pixel[0] = b;
    pixel[1] = g;
    pixel[2] = r;
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageFormat, Rgba, RgbaImage};
    use std::path::PathBuf;

    /// Write a solid-colour PNG to a temp file and return its path.
    fn write_png(name: &str, width: u32, height: u32, pixel: Rgba<u8>) -> PathBuf {
        let img = RgbaImage::from_pixel(width, height, pixel);
        let mut bytes = Vec::new();
        DynamicImage::ImageRgba8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();
        let path = std::env::temp_dir().join(format!("n30f_test_{}_{}.png", std::process::id(), name));
        fs::write(&path, bytes).unwrap();
        path
    }

    #[test]
    fn natural_dimensions_match_the_file() {
        let path = write_png("dims", 7, 3, Rgba([10, 20, 30, 255]));
        let image = load_image(&path, 1.0).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(image.natural_width, 7);
        assert_eq!(image.natural_height, 3);
        assert_eq!(image.width, 7);
        assert_eq!(image.height, 3);
        assert_eq!(image.pixels.len(), 7 * 3 * 4);
    }

    #[test]
    fn scaling_rounds_dimensions() {
        let path = write_png("scale", 3, 2, Rgba([0, 0, 0, 255]));
        let image = load_image(&path, 0.5).unwrap();
        let _ = fs::remove_file(&path);
        // round(3 * 0.5) = 2, round(2 * 0.5) = 1
        assert_eq!(image.width, 2);
        assert_eq!(image.height, 1);
        assert_eq!(image.pixels.len(), 2 * 1 * 4);
        // natural dimensions are unaffected by scaling
        assert_eq!(image.natural_width, 3);
        assert_eq!(image.natural_height, 2);
    }

    #[test]
    fn pixels_are_premultiplied_bgra() {
        let path = write_png("premul", 1, 1, Rgba([255, 100, 0, 128]));
        let image = load_image(&path, 1.0).unwrap();
        let _ = fs::remove_file(&path);
        // r=255 g=100 b=0 a=128 -> b'=0 g'=50 r'=128 a=128
        assert_eq!(&image.pixels, &[0, 50, 128, 128]);
    }

    #[test]
    fn opaque_pixels_pass_through_as_bgra() {
        let path = write_png("opaque", 1, 1, Rgba([1, 2, 3, 255]));
        let image = load_image(&path, 1.0).unwrap();
        let _ = fs::remove_file(&path);
        assert_eq!(&image.pixels, &[3, 2, 1, 255]);
    }

    #[test]
    fn undecodable_file_is_an_error() {
        let path = std::env::temp_dir().join(format!("n30f_test_{}_garbage.png", std::process::id()));
        fs::write(&path, b"not an image").unwrap();
        let result = load_image(&path, 1.0);
        let _ = fs::remove_file(&path);
        assert!(result.is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        assert!(load_image(Path::new("/nonexistent/n30f.png"), 1.0).is_err());
    }
}
