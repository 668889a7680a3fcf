//! CLI output formatting.
//!
//! # Output Format
//!
//! ## Convert
//!
//! ```text
//! images/pages (3 files)
//!     ✓ [1/3] 001-cover.png → 001-cover.webp (-71.4%)
//!     ✗ [2/3] 002-spread.jpg: decode failed: ...
//!     ○ [3/3] 003-back.png (up to date)
//! images/extracted: not found, skipped
//!
//! Summary
//!     Converted: 1
//!     Skipped:   1
//!     Failed:    1
//!     Original:  2.41 MB
//!     WebP:      0.69 MB
//!     Saved:     1.72 MB (71.4%)
//!     Elapsed:   3.2s
//!
//! Failures
//!     002-spread.jpg: decode failed: ...
//! ```
//!
//! ## Check
//!
//! ```text
//! convert 001-cover.png → 001-cover.webp (missing)
//! skip    003-back.png (up to date)
//!
//! 1 to convert, 1 to skip
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format
//! functions are pure — no I/O, no side effects.

use crate::markup::RewriteStats;
use crate::process::{PlannedAction, PlannedFile, ProcessEvent};
use crate::staleness::Freshness;
use crate::summary::BatchSummary;
use crate::types::{ConversionOutcome, SkipReason, display_name};
use std::path::Path;

/// Failures listed in full in the summary; the rest are counted.
pub const MAX_FAILURES_SHOWN: usize = 5;

fn megabytes(bytes: u64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

fn signed_megabytes(bytes: i64) -> f64 {
    bytes as f64 / 1024.0 / 1024.0
}

// ============================================================================
// Convert: progress
// ============================================================================

/// Format one per-file outcome as a progress line.
///
/// ```text
/// ✓ [1/3] a.png → a.webp (-42.0%)
/// ✗ [2/3] b.png: decode failed: ...
/// ○ [3/3] c.png (up to date)
/// ```
pub fn format_outcome(index: usize, total: usize, outcome: &ConversionOutcome) -> String {
    match outcome {
        ConversionOutcome::Converted(c) => {
            // Size change relative to the original.
            let change = if c.savings == 0.0 { 0.0 } else { -c.savings };
            format!(
                "\u{2713} [{index}/{total}] {} \u{2192} {} ({change:+.1}%)",
                c.input, c.output
            )
        }
        ConversionOutcome::Failed { path, error } => {
            format!("\u{2717} [{index}/{total}] {}: {error}", display_name(path))
        }
        ConversionOutcome::Skipped { path, reason } => {
            format!("\u{25cb} [{index}/{total}] {} ({reason})", display_name(path))
        }
    }
}

/// Format a single progress event as display lines.
pub fn format_event(event: &ProcessEvent) -> Vec<String> {
    match event {
        ProcessEvent::DirectoryStarted { path, file_count } => {
            let noun = if *file_count == 1 { "file" } else { "files" };
            vec![format!("{} ({file_count} {noun})", path.display())]
        }
        ProcessEvent::PathMissing { path } => {
            vec![format!("{}: not found, skipped", path.display())]
        }
        ProcessEvent::FileFinished {
            index,
            total,
            outcome,
        } => vec![format!("    {}", format_outcome(*index, *total, outcome))],
    }
}

pub fn print_event(event: &ProcessEvent) {
    for line in format_event(event) {
        println!("{}", line);
    }
}

// ============================================================================
// Convert: summary
// ============================================================================

/// Format the end-of-run report.
///
/// Byte figures appear only when something was converted. At most
/// [`MAX_FAILURES_SHOWN`] failures are listed.
pub fn format_summary(summary: &BatchSummary) -> Vec<String> {
    let mut lines = vec![
        "Summary".to_string(),
        format!("    Converted: {}", summary.converted_count()),
        format!("    Skipped:   {}", summary.skipped_count()),
        format!("    Failed:    {}", summary.failed_count()),
    ];

    if summary.converted_count() > 0 {
        lines.push(format!(
            "    Original:  {:.2} MB",
            megabytes(summary.total_original_bytes())
        ));
        lines.push(format!(
            "    WebP:      {:.2} MB",
            megabytes(summary.total_new_bytes())
        ));
        lines.push(format!(
            "    Saved:     {:.2} MB ({:.1}%)",
            signed_megabytes(summary.bytes_saved()),
            summary.percent_saved()
        ));
    }
    lines.push(format!(
        "    Elapsed:   {:.1}s",
        summary.elapsed().as_secs_f64()
    ));

    if summary.interrupted() {
        lines.push(String::new());
        lines.push(format!(
            "Interrupted: {} file(s) not started",
            summary.skipped_for(SkipReason::Cancelled)
        ));
    }

    let failed = summary.failed_count();
    if failed > 0 {
        lines.push(String::new());
        lines.push("Failures".to_string());
        for (path, error) in summary.failures().take(MAX_FAILURES_SHOWN) {
            lines.push(format!("    {}: {error}", display_name(path)));
        }
        if failed > MAX_FAILURES_SHOWN {
            lines.push(format!("    ... and {} more", failed - MAX_FAILURES_SHOWN));
        }
    }
    lines
}

pub fn print_summary(summary: &BatchSummary) {
    println!();
    for line in format_summary(summary) {
        println!("{}", line);
    }
}

// ============================================================================
// Check (dry run)
// ============================================================================

fn freshness_label(freshness: Freshness) -> &'static str {
    match freshness {
        Freshness::Missing => "missing",
        Freshness::Stale => "stale",
        Freshness::UpToDate => "up to date",
    }
}

/// Format the dry-run plan: one line per file plus a tally.
pub fn format_plan(planned: &[PlannedFile]) -> Vec<String> {
    let mut lines = Vec::with_capacity(planned.len() + 2);
    let (mut convert, mut skip, mut errors) = (0, 0, 0);

    for file in planned {
        let name = display_name(&file.path);
        match &file.action {
            PlannedAction::Convert { output, freshness } => {
                convert += 1;
                lines.push(format!(
                    "convert {name} \u{2192} {} ({})",
                    display_name(output),
                    freshness_label(*freshness)
                ));
            }
            PlannedAction::Skip(reason) => {
                skip += 1;
                lines.push(format!("skip    {name} ({reason})"));
            }
            PlannedAction::Error(message) => {
                errors += 1;
                lines.push(format!("error   {name}: {message}"));
            }
        }
    }

    lines.push(String::new());
    let mut tally = format!("{convert} to convert, {skip} to skip");
    if errors > 0 {
        tally.push_str(&format!(", {errors} unreadable"));
    }
    lines.push(tally);
    lines
}

pub fn print_plan(planned: &[PlannedFile]) {
    for line in format_plan(planned) {
        println!("{}", line);
    }
}

// ============================================================================
// Rewrite
// ============================================================================

/// Format the markup rewrite report.
pub fn format_rewrite(document: &Path, stats: &RewriteStats, dry_run: bool) -> Vec<String> {
    let verb = if dry_run { "Would update" } else { "Updated" };
    vec![
        format!("{verb} {}", document.display()),
        format!("    PNG references:  {}", stats.png_references),
        format!("    Tags rewritten:  {}", stats.rewritten),
        format!("    WebP references: {}", stats.webp_references),
    ]
}

pub fn print_rewrite(document: &Path, stats: &RewriteStats, dry_run: bool) {
    for line in format_rewrite(document, stats, dry_run) {
        println!("{}", line);
    }
}
