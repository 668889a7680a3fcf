//! Shared test utilities: synthetic images and mtime control.
//!
//! Images are generated with the `image` encoders so tests never depend on
//! checked-in binary fixtures.

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;
use std::time::{Duration, SystemTime};

// =========================================================================
// Synthetic images
// =========================================================================

/// Opaque RGB gradient PNG.
pub fn create_test_png_rgb(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// RGBA PNG whose left half is fully transparent and right half opaque.
pub fn create_test_png_rgba(path: &Path, width: u32, height: u32) {
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let alpha = if x < width / 2 { 0 } else { 255 };
        image::Rgba([(x % 256) as u8, (y % 256) as u8, 200, alpha])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Grayscale + alpha PNG.
pub fn create_test_png_luma_alpha(path: &Path, width: u32, height: u32) {
    let img = image::GrayAlphaImage::from_fn(width, height, |x, _| {
        image::LumaA([(x % 256) as u8, if x % 2 == 0 { 0 } else { 255 }])
    });
    img.save_with_format(path, image::ImageFormat::Png).unwrap();
}

/// Indexed-color PNG: left half uses palette entry 0 (red), right half
/// entry 1 (blue). With `transparent_first`, a tRNS chunk makes entry 0
/// fully transparent.
pub fn create_test_png_palette(
    path: &Path,
    width: u32,
    height: u32,
    transparent_first: bool,
) {
    let file = std::fs::File::create(path).unwrap();
    let mut encoder = png::Encoder::new(std::io::BufWriter::new(file), width, height);
    encoder.set_color(png::ColorType::Indexed);
    encoder.set_depth(png::BitDepth::Eight);
    encoder.set_palette(vec![255, 0, 0, 0, 0, 255]);
    if transparent_first {
        encoder.set_trns(vec![0]);
    }
    let indices: Vec<u8> = (0..height)
        .flat_map(|_| (0..width).map(move |x| u8::from(x >= width / 2)))
        .collect();
    let mut writer = encoder.write_header().unwrap();
    writer.write_image_data(&indices).unwrap();
    writer.finish().unwrap();
}

/// Baseline JPEG with a gradient.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, 128])
    });
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new(writer)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// A file with an image extension but garbage content.
pub fn write_corrupt(path: &Path) {
    std::fs::write(path, b"this is not an image at all").unwrap();
}

// =========================================================================
// Timestamps
// =========================================================================

pub fn seconds_after_epoch(secs: u64) -> SystemTime {
    SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
}

/// Set a file's modification time.
pub fn set_mtime(path: &Path, time: SystemTime) {
    let file = std::fs::OpenOptions::new().write(true).open(path).unwrap();
    file.set_modified(time).unwrap();
}
