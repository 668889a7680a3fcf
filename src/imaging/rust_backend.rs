//! Production backend: `image` decoders + libwebp encoder.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (PNG, JPEG) | `image::ImageReader` with content sniffing |
//! | Mode normalization | `DynamicImage::into_rgb8` / `into_rgba8` |
//! | Encode → WebP (lossy, quality + method) | `webp::Encoder::encode_advanced` |
//!
//! The `image` crate's own WebP encoder is lossless-only, hence libwebp for
//! the lossy encode.

use super::backend::{BackendError, ColorMode, Encoded, ImageBackend};
use super::params::{EncodeParams, Effort, Quality};
use image::{DynamicImage, ImageReader};
use std::path::Path;

/// Backend using the `image` decoders and libwebp.
#[derive(Debug, Clone, Copy, Default)]
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

/// Load and decode an image from disk.
///
/// The format is sniffed from the content, so a JPEG saved with a `.png`
/// name still decodes.
fn load_image(path: &Path) -> Result<DynamicImage, BackendError> {
    ImageReader::open(path)
        .map_err(BackendError::Io)?
        .with_guessed_format()
        .map_err(BackendError::Io)?
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))
}

/// Flatten to 8-bit RGB or RGBA according to the source's alpha channel.
fn normalize(img: DynamicImage) -> (ColorMode, u32, u32, Vec<u8>) {
    let mode = ColorMode::from_color_type(img.color());
    let (width, height) = (img.width(), img.height());
    let pixels = match mode {
        ColorMode::Rgba => img.into_rgba8().into_raw(),
        ColorMode::Rgb => img.into_rgb8().into_raw(),
    };
    (mode, width, height, pixels)
}

/// Lossy WebP encode of raw interleaved pixels.
fn encode_webp(
    pixels: &[u8],
    mode: ColorMode,
    width: u32,
    height: u32,
    quality: Quality,
    effort: Effort,
) -> Result<Vec<u8>, BackendError> {
    let mut config = webp::WebPConfig::new()
        .map_err(|_| BackendError::Encode("libwebp rejected the default config".into()))?;
    config.lossless = 0;
    config.quality = quality.value() as f32;
    config.method = effort.value() as i32;

    let encoder = match mode {
        ColorMode::Rgba => webp::Encoder::from_rgba(pixels, width, height),
        ColorMode::Rgb => webp::Encoder::from_rgb(pixels, width, height),
    };
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| BackendError::Encode(format!("{e:?} ({width}x{height})")))?;
    Ok(memory.to_vec())
}

impl ImageBackend for RustBackend {
    fn encode(&self, params: &EncodeParams) -> Result<Encoded, BackendError> {
        let img = load_image(&params.source)?;
        let (mode, width, height, pixels) = normalize(img);
        let bytes = encode_webp(&pixels, mode, width, height, params.quality, params.effort)?;
        Ok(Encoded {
            bytes,
            mode,
            width,
            height,
        })
    }
}
