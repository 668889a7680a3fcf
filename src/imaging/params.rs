//! Parameter types for the WebP encode.
//!
//! These describe *what* to produce; the [`backend`](super::backend) decides
//! *how*. Keeping them separate lets tests swap in a mock backend and assert
//! on exactly what was requested.
//!
//! - [`Quality`] — lossy quality (0–100, default 85). Clamped on construction.
//! - [`Effort`] — encoder method (0–6, default 6 = slowest, smallest output).
//! - [`EncodeParams`] — source path plus the two knobs above.

use std::path::PathBuf;

/// Quality setting for lossy WebP encoding (0-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(pub u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.min(100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(85)
    }
}

/// Compression effort, libwebp's `method` (0 = fastest, 6 = best).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Effort(pub u32);

impl Effort {
    pub const MAX: u32 = 6;

    pub fn new(value: u32) -> Self {
        Self(value.min(Self::MAX))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Effort {
    fn default() -> Self {
        Self(Self::MAX)
    }
}

/// Full specification of one transcode.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeParams {
    pub source: PathBuf,
    pub quality: Quality,
    pub effort: Effort,
}
