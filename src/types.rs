//! Shared types passed between the pipeline components.
//!
//! Every file the walker touches yields exactly one [`ConversionOutcome`].
//! Outcomes are plain data: failures are values, not errors, so the walker
//! never needs error handling to keep a batch alive.

use crate::imaging::ColorMode;
use serde::Serialize;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// An input file as observed at the start of its pipeline pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputFile {
    pub path: PathBuf,
    pub modified: SystemTime,
}

impl InputFile {
    /// Stat `path` and capture its modification time.
    pub fn stat(path: &Path) -> io::Result<Self> {
        let meta = std::fs::metadata(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            modified: meta.modified()?,
        })
    }

    /// File name for display, falling back to the full path.
    pub fn name(&self) -> String {
        display_name(&self.path)
    }
}

/// Why a file was not converted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SkipReason {
    /// Extension is not one of png/jpg/jpeg.
    NotAnImage,
    /// The output exists and is at least as new as the input.
    AlreadyUpToDate,
    /// The run was interrupted before this file started.
    Cancelled,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            SkipReason::NotAnImage => "not an image",
            SkipReason::AlreadyUpToDate => "up to date",
            SkipReason::Cancelled => "cancelled",
        };
        f.write_str(text)
    }
}

/// A successful conversion, with sizes read back from the filesystem.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Converted {
    /// Input file name.
    pub input: String,
    /// Output file name.
    pub output: String,
    pub original_size: u64,
    pub new_size: u64,
    /// `(original - new) / original * 100`. Negative when the output grew.
    pub savings: f64,
    pub mode: ColorMode,
}

/// Result of one pipeline pass over one file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ConversionOutcome {
    Converted(Converted),
    Skipped { path: PathBuf, reason: SkipReason },
    Failed { path: PathBuf, error: String },
}

impl ConversionOutcome {
    pub fn skipped(path: &Path, reason: SkipReason) -> Self {
        Self::Skipped {
            path: path.to_path_buf(),
            reason,
        }
    }

    pub fn failed(path: &Path, error: impl fmt::Display) -> Self {
        Self::Failed {
            path: path.to_path_buf(),
            error: error.to_string(),
        }
    }

    pub fn is_converted(&self) -> bool {
        matches!(self, Self::Converted(_))
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped { .. })
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Last path component as a string, or the whole path if there is none.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
