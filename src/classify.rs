//! Input eligibility and output path derivation.
//!
//! The accepted inputs are a closed set matched exactly on the lowercased
//! extension: `png`, `jpg`, `jpeg`. Anything else is not an image as far as
//! the pipeline is concerned, even if it would decode.
//!
//! ```text
//! photos/Dawn.PNG   →  photos/Dawn.webp
//! photos/dusk.jpeg  →  photos/dusk.webp
//! photos/notes.txt  →  not an image
//! ```

use serde::Serialize;
use std::path::{Path, PathBuf};

/// Extension written for every output.
pub const TARGET_EXTENSION: &str = "webp";

/// Source encodings the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceFormat {
    Png,
    Jpeg,
}

const ACCEPTED_EXTENSIONS: &[(&str, SourceFormat)] = &[
    ("png", SourceFormat::Png),
    ("jpg", SourceFormat::Jpeg),
    ("jpeg", SourceFormat::Jpeg),
];

/// Classification of a single path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    Eligible {
        format: SourceFormat,
        output: PathBuf,
    },
    NotAnImage,
}

/// Look up the source format for a path's extension (case-insensitive).
pub fn source_format(path: &Path) -> Option<SourceFormat> {
    let ext = path.extension()?.to_str()?.to_ascii_lowercase();
    ACCEPTED_EXTENSIONS
        .iter()
        .find(|(accepted, _)| *accepted == ext)
        .map(|(_, format)| *format)
}

/// Classify `path` and, when eligible, derive its output path.
pub fn classify(path: &Path) -> Classification {
    match source_format(path) {
        Some(format) => Classification::Eligible {
            format,
            output: output_path(path),
        },
        None => Classification::NotAnImage,
    }
}

/// Same directory, same stem, `.webp` extension.
pub fn output_path(path: &Path) -> PathBuf {
    path.with_extension(TARGET_EXTENSION)
}
