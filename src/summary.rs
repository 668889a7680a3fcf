//! Batch-wide aggregation of per-file outcomes.
//!
//! A [`BatchSummary`] is owned by the driver and fed one outcome per file.
//! Byte totals are summed over converted files only: skipped and failed
//! files contribute to the counts but not to the savings.

use crate::transcode::savings_percent;
use crate::types::{ConversionOutcome, Converted, SkipReason};
use serde::Serialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchSummary {
    outcomes: Vec<ConversionOutcome>,
    elapsed: Duration,
    interrupted: bool,
}

impl BatchSummary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, outcome: ConversionOutcome) {
        self.outcomes.push(outcome);
    }

    pub fn outcomes(&self) -> &[ConversionOutcome] {
        &self.outcomes
    }

    pub fn len(&self) -> usize {
        self.outcomes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn converted(&self) -> impl Iterator<Item = &Converted> {
        self.outcomes.iter().filter_map(|o| match o {
            ConversionOutcome::Converted(c) => Some(c),
            _ => None,
        })
    }

    /// Failed files with their messages, in recorded order.
    pub fn failures(&self) -> impl Iterator<Item = (&Path, &str)> {
        self.outcomes.iter().filter_map(|o| match o {
            ConversionOutcome::Failed { path, error } => Some((path.as_path(), error.as_str())),
            _ => None,
        })
    }

    pub fn converted_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_converted()).count()
    }

    pub fn skipped_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_skipped()).count()
    }

    pub fn skipped_for(&self, reason: SkipReason) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, ConversionOutcome::Skipped { reason: r, .. } if *r == reason))
            .count()
    }

    pub fn failed_count(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_failed()).count()
    }

    pub fn total_original_bytes(&self) -> u64 {
        self.converted().map(|c| c.original_size).sum()
    }

    pub fn total_new_bytes(&self) -> u64 {
        self.converted().map(|c| c.new_size).sum()
    }

    /// Negative when the outputs are larger than the inputs overall.
    pub fn bytes_saved(&self) -> i64 {
        self.total_original_bytes() as i64 - self.total_new_bytes() as i64
    }

    /// Overall savings across converted files; 0 when nothing was converted.
    pub fn percent_saved(&self) -> f64 {
        savings_percent(self.total_original_bytes(), self.total_new_bytes())
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }

    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    pub fn mark_interrupted(&mut self) {
        self.interrupted = true;
    }

    pub fn interrupted(&self) -> bool {
        self.interrupted
    }

    /// Serializable view of the summary for `--json`.
    pub fn report(&self) -> SummaryReport<'_> {
        SummaryReport {
            converted: self.converted_count(),
            skipped: self.skipped_count(),
            failed: self.failed_count(),
            total_original_bytes: self.total_original_bytes(),
            total_new_bytes: self.total_new_bytes(),
            bytes_saved: self.bytes_saved(),
            percent_saved: self.percent_saved(),
            elapsed_secs: self.elapsed.as_secs_f64(),
            interrupted: self.interrupted,
            outcomes: &self.outcomes,
        }
    }
}

impl Extend<ConversionOutcome> for BatchSummary {
    fn extend<I: IntoIterator<Item = ConversionOutcome>>(&mut self, iter: I) {
        self.outcomes.extend(iter);
    }
}

impl FromIterator<ConversionOutcome> for BatchSummary {
    fn from_iter<I: IntoIterator<Item = ConversionOutcome>>(iter: I) -> Self {
        let mut summary = Self::new();
        summary.extend(iter);
        summary
    }
}

impl fmt::Display for BatchSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} converted, {} skipped, {} failed",
            self.converted_count(),
            self.skipped_count(),
            self.failed_count()
        )?;
        if self.converted_count() > 0 {
            write!(f, " ({:.1}% saved)", self.percent_saved())?;
        }
        Ok(())
    }
}

#[derive(Debug, Serialize)]
pub struct SummaryReport<'a> {
    pub converted: usize,
    pub skipped: usize,
    pub failed: usize,
    pub total_original_bytes: u64,
    pub total_new_bytes: u64,
    pub bytes_saved: i64,
    pub percent_saved: f64,
    pub elapsed_secs: f64,
    pub interrupted: bool,
    pub outcomes: &'a [ConversionOutcome],
}
