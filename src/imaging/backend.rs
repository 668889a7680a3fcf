//! Image backend trait and shared types.
//!
//! [`ImageBackend::encode`] is the single codec operation the pipeline needs:
//! decode a source file, normalize its color mode, and return encoded WebP
//! bytes. Writing those bytes is the caller's job, which keeps file writes
//! atomic and lets a timed-out encode be dropped without touching disk.
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend).

use super::params::EncodeParams;
use image::ColorType;
use serde::Serialize;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("encode failed: {0}")]
    Encode(String),
}

/// Pixel layout the encoder is fed.
///
/// Decided once per file from the decoded color type. Anything carrying an
/// alpha channel keeps it; everything else is flattened to three channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Rgb,
    Rgba,
}

impl ColorMode {
    /// Palette PNGs are expanded by the decoder: with a tRNS chunk they
    /// arrive as RGBA, without one as RGB.
    pub fn from_color_type(color: ColorType) -> Self {
        if color.has_alpha() {
            ColorMode::Rgba
        } else {
            ColorMode::Rgb
        }
    }
}

/// Encoded output held in memory until the caller persists it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub mode: ColorMode,
    pub width: u32,
    pub height: u32,
}

/// Trait for image codec backends.
///
/// `Send + Sync + 'static` so a backend can be shared across rayon workers
/// and handed to a helper thread when a per-file timeout is in force.
pub trait ImageBackend: Send + Sync + 'static {
    /// Decode `params.source` and encode it as WebP.
    fn encode(&self, params: &EncodeParams) -> Result<Encoded, BackendError>;
}
