//! Batch driver: walks the configured targets and runs every file through
//! classify → staleness → transcode.
//!
//! ## Order and parallelism
//!
//! Targets are handled in the order given. Files inside one directory are
//! processed in parallel with [rayon](https://docs.rs/rayon). Files that map
//! to the same output (`a.png` and `a.jpg` both become `a.webp`) form one
//! group that runs sequentially in listing order, so the later member sees
//! the earlier write through the staleness check. Distinct groups write
//! distinct paths and share no mutable state. Outcomes are put back in
//! listing order and collected into the single [`BatchSummary`] owned by
//! [`Pipeline::run`].
//!
//! Progress is streamed as [`ProcessEvent`]s over an optional channel so the
//! caller can print while the batch is still running.
//!
//! ## Failure policy
//!
//! | Condition | Effect |
//! |---|---|
//! | Extension not accepted | Skipped(not-an-image) |
//! | Output current | Skipped(already-up-to-date) |
//! | Decode / encode / write failure | Failed, batch continues |
//! | Target path missing | warning, zero files, batch continues |
//! | Every target missing | fatal [`ProcessError::NoDirectories`] |
//! | Existing directory unreadable | fatal [`ProcessError::Scan`] |
//!
//! ## Cancellation
//!
//! [`Pipeline::cancel_flag`] hands out the shared flag. Once set, files that
//! have not started yet are recorded as Skipped(cancelled); files already in
//! flight finish normally. Output writes are atomic, so an interrupted run
//! never leaves a partial `.webp` behind.

use crate::classify::{self, Classification};
use crate::scan::{self, DirectoryListing, ScanError};
use crate::staleness::{self, Freshness};
use crate::summary::BatchSummary;
use crate::transcode::Transcoder;
use crate::types::{ConversionOutcome, InputFile, SkipReason};
use rayon::prelude::*;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error(transparent)]
    Scan(#[from] ScanError),
    #[error("none of the given paths exist: {}", display_paths(.0))]
    NoDirectories(Vec<PathBuf>),
}

fn display_paths(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Progress notifications emitted while a batch runs.
#[derive(Debug, Clone, PartialEq)]
pub enum ProcessEvent {
    DirectoryStarted { path: PathBuf, file_count: usize },
    PathMissing { path: PathBuf },
    /// `index` is 1-based within the current directory.
    FileFinished {
        index: usize,
        total: usize,
        outcome: ConversionOutcome,
    },
}

/// A command-line or configured target after enumeration.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    File(PathBuf),
    Directory { path: PathBuf, files: Vec<PathBuf> },
    Missing(PathBuf),
}

/// Enumerate every target up front, in order.
///
/// Existing regular files are taken as-is; everything else is listed as a
/// directory. Fails when no target exists at all.
pub fn resolve_targets(targets: &[PathBuf]) -> Result<Vec<Target>, ProcessError> {
    let mut resolved = Vec::with_capacity(targets.len());
    for path in targets {
        if path.is_file() {
            resolved.push(Target::File(path.clone()));
            continue;
        }
        match scan::list_images(path)? {
            DirectoryListing::Missing => resolved.push(Target::Missing(path.clone())),
            DirectoryListing::Found(files) => resolved.push(Target::Directory {
                path: path.clone(),
                files,
            }),
        }
    }

    let all_missing = resolved.iter().all(|t| matches!(t, Target::Missing(_)));
    if all_missing && !resolved.is_empty() {
        return Err(ProcessError::NoDirectories(targets.to_vec()));
    }
    Ok(resolved)
}

/// What `convert` would do with a file, without doing it.
#[derive(Debug, Clone, PartialEq)]
pub enum PlannedAction {
    Convert { output: PathBuf, freshness: Freshness },
    Skip(SkipReason),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlannedFile {
    pub path: PathBuf,
    pub action: PlannedAction,
}

/// Classify and check staleness only. No decoding, no writes.
pub fn plan_file(path: &Path) -> PlannedAction {
    let Classification::Eligible { output, .. } = classify::classify(path) else {
        return PlannedAction::Skip(SkipReason::NotAnImage);
    };
    let input = match InputFile::stat(path) {
        Ok(input) => input,
        Err(e) => return PlannedAction::Error(format!("stat failed: {e}")),
    };
    match staleness::check(&input, &output) {
        Ok(Freshness::UpToDate) => PlannedAction::Skip(SkipReason::AlreadyUpToDate),
        Ok(freshness) => PlannedAction::Convert { output, freshness },
        Err(e) => PlannedAction::Error(format!("cannot stat {}: {e}", output.display())),
    }
}

/// Dry run over all targets.
pub fn plan(targets: &[PathBuf]) -> Result<Vec<PlannedFile>, ProcessError> {
    let mut planned = Vec::new();
    for target in resolve_targets(targets)? {
        let files = match target {
            Target::File(path) => vec![path],
            Target::Directory { files, .. } => files,
            Target::Missing(path) => {
                warn!(path = %path.display(), "path does not exist, skipping");
                continue;
            }
        };
        planned.extend(files.into_iter().map(|path| PlannedFile {
            action: plan_file(&path),
            path,
        }));
    }
    Ok(planned)
}

/// Indices of `files` grouped by derived output path, groups in order of
/// first appearance, members in listing order.
fn group_by_output(files: &[PathBuf]) -> Vec<Vec<usize>> {
    let mut slots: HashMap<PathBuf, usize> = HashMap::new();
    let mut groups: Vec<Vec<usize>> = Vec::new();
    for (i, path) in files.iter().enumerate() {
        let slot = *slots.entry(classify::output_path(path)).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[slot].push(i);
    }
    groups
}

pub struct Pipeline {
    transcoder: Transcoder,
    cancel: Arc<AtomicBool>,
}

impl Pipeline {
    pub fn new(transcoder: Transcoder) -> Self {
        Self {
            transcoder,
            cancel: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag; storing `true` stops new files from starting.
    pub fn cancel_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.cancel)
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.load(Ordering::SeqCst)
    }

    /// Run one file through the pipeline. Always yields exactly one outcome.
    pub fn process_file(&self, path: &Path) -> ConversionOutcome {
        if self.is_cancelled() {
            return ConversionOutcome::skipped(path, SkipReason::Cancelled);
        }

        let Classification::Eligible { format, output } = classify::classify(path) else {
            debug!(path = %path.display(), "not an image");
            return ConversionOutcome::skipped(path, SkipReason::NotAnImage);
        };

        let input = match InputFile::stat(path) {
            Ok(input) => input,
            Err(e) => return ConversionOutcome::failed(path, format!("stat failed: {e}")),
        };

        match staleness::check(&input, &output) {
            Ok(Freshness::UpToDate) => {
                debug!(path = %path.display(), "output up to date");
                ConversionOutcome::skipped(path, SkipReason::AlreadyUpToDate)
            }
            Ok(freshness) => {
                debug!(path = %path.display(), ?format, ?freshness, "converting");
                self.transcoder.transcode(&input, &output)
            }
            Err(e) => {
                ConversionOutcome::failed(path, format!("cannot stat {}: {e}", output.display()))
            }
        }
    }

    /// Process one directory's files in parallel, preserving listing order.
    ///
    /// Files sharing an output path are handled one after another.
    pub fn process_files(
        &self,
        files: &[PathBuf],
        events: Option<&Sender<ProcessEvent>>,
    ) -> Vec<ConversionOutcome> {
        let total = files.len();
        let mut indexed: Vec<(usize, ConversionOutcome)> = group_by_output(files)
            .par_iter()
            .map_with(events.cloned(), |events, group| {
                group
                    .iter()
                    .map(|&i| {
                        let outcome = self.process_file(&files[i]);
                        if let Some(tx) = events {
                            let _ = tx.send(ProcessEvent::FileFinished {
                                index: i + 1,
                                total,
                                outcome: outcome.clone(),
                            });
                        }
                        (i, outcome)
                    })
                    .collect::<Vec<_>>()
            })
            .flatten()
            .collect();
        indexed.sort_by_key(|(i, _)| *i);
        indexed.into_iter().map(|(_, outcome)| outcome).collect()
    }

    /// Process every target in order and aggregate the outcomes.
    pub fn run(
        &self,
        targets: &[PathBuf],
        events: Option<Sender<ProcessEvent>>,
    ) -> Result<BatchSummary, ProcessError> {
        let started = Instant::now();
        let send = |event: ProcessEvent| {
            if let Some(tx) = &events {
                let _ = tx.send(event);
            }
        };

        let mut summary = BatchSummary::new();
        for target in resolve_targets(targets)? {
            match target {
                Target::Missing(path) => {
                    warn!(path = %path.display(), "path does not exist, skipping");
                    send(ProcessEvent::PathMissing { path });
                }
                Target::File(path) => {
                    summary.extend(self.process_files(std::slice::from_ref(&path), events.as_ref()));
                }
                Target::Directory { path, files } => {
                    info!(directory = %path.display(), files = files.len(), "processing directory");
                    send(ProcessEvent::DirectoryStarted {
                        path,
                        file_count: files.len(),
                    });
                    summary.extend(self.process_files(&files, events.as_ref()));
                }
            }
        }

        summary.set_elapsed(started.elapsed());
        if self.is_cancelled() {
            summary.mark_interrupted();
        }
        info!(%summary, "batch finished");
        Ok(summary)
    }
}
