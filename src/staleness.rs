//! Convert-or-skip decision based on modification times.
//!
//! The only incrementality contract is the filesystem timestamp: an output is
//! rewritten when it is absent or strictly older than its input. Equal mtimes
//! count as up to date, which avoids reconverting on filesystems with coarse
//! (one or two second) timestamp granularity. No content hashing.

use crate::types::InputFile;
use std::io;
use std::path::Path;
use std::time::SystemTime;

/// State of an output relative to its input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// No output on disk.
    Missing,
    /// Output exists but the input changed after it was written.
    Stale,
    /// Output mtime is at or after the input mtime.
    UpToDate,
}

impl Freshness {
    pub fn should_convert(self) -> bool {
        !matches!(self, Freshness::UpToDate)
    }
}

/// Equal timestamps are up to date.
pub fn is_up_to_date(input_modified: SystemTime, output_modified: SystemTime) -> bool {
    output_modified >= input_modified
}

/// Compare `input` against whatever currently sits at `output`.
///
/// Only a missing output maps to [`Freshness::Missing`]; any other stat
/// failure is returned so the caller can record it against the file.
pub fn check(input: &InputFile, output: &Path) -> io::Result<Freshness> {
    let meta = match std::fs::metadata(output) {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Freshness::Missing),
        Err(e) => return Err(e),
    };
    if is_up_to_date(input.modified, meta.modified()?) {
        Ok(Freshness::UpToDate)
    } else {
        Ok(Freshness::Stale)
    }
}

/// Convenience wrapper returning only the decision.
pub fn should_convert(input: &InputFile, output: &Path) -> io::Result<bool> {
    check(input, output).map(Freshness::should_convert)
}
