//! Run configuration.
//!
//! Loaded from `webpify.toml` in the working directory (or the path given
//! with `--config`). Every key is optional; a missing file means stock
//! defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # Directories scanned in order, non-recursively.
//! directories = ["images/extracted", "images/pages"]
//!
//! [webp]
//! quality = 85              # Lossy quality (0-100)
//! method = 6                # Encoder effort (0 = fast, 6 = smallest)
//!
//! [processing]
//! max_processes = 4         # Max parallel workers (omit for auto = CPU cores)
//! file_timeout_secs = 300   # Per-file encode limit, 0 disables
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::imaging::{Effort, Quality};
use crate::transcode::TranscodeSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILENAME: &str = "webpify.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Directories to scan, in processing order.
    pub directories: Vec<PathBuf>,
    /// Encoder settings.
    pub webp: WebpConfig,
    /// Parallelism and timeout settings.
    pub processing: ProcessingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            directories: vec![
                PathBuf::from("images/extracted"),
                PathBuf::from("images/pages"),
            ],
            webp: WebpConfig::default(),
            processing: ProcessingConfig::default(),
        }
    }
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.webp.quality > 100 {
            return Err(ConfigError::Validation("webp.quality must be 0-100".into()));
        }
        if self.webp.method > Effort::MAX {
            return Err(ConfigError::Validation(format!(
                "webp.method must be 0-{}",
                Effort::MAX
            )));
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Encoder settings for the transcoder.
    pub fn transcode_settings(&self) -> TranscodeSettings {
        TranscodeSettings {
            quality: Quality::new(self.webp.quality),
            effort: Effort::new(self.webp.method),
            timeout: self.processing.file_timeout(),
        }
    }
}

/// WebP encoder settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct WebpConfig {
    /// Lossy quality, 0 = worst, 100 = best.
    pub quality: u32,
    /// libwebp `method`: 0 = fastest, 6 = slowest and smallest.
    pub method: u32,
}

impl Default for WebpConfig {
    fn default() -> Self {
        Self {
            quality: Quality::default().value(),
            method: Effort::default().value(),
        }
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_processes: Option<usize>,
    /// Per-file decode+encode limit in seconds. 0 disables the limit.
    pub file_timeout_secs: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            file_timeout_secs: 300,
        }
    }
}

impl ProcessingConfig {
    pub fn file_timeout(&self) -> Option<Duration> {
        (self.file_timeout_secs > 0).then(|| Duration::from_secs(self.file_timeout_secs))
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config.max_processes.map(|n| n.min(cores)).unwrap_or(cores)
}

/// Parse and validate a config from TOML text.
pub fn parse_config(content: &str) -> Result<Config, ConfigError> {
    let config: Config = toml::from_str(content)?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// Returns stock defaults when the file does not exist. Invalid TOML,
/// unknown keys and out-of-range values are errors.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `webpify.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# webpify configuration
# =====================
# All settings are optional. Values shown below are the defaults.
# Unknown keys will cause an error.

# Directories to convert, processed in this order. Only files directly
# inside each directory are considered (no recursion). Missing directories
# are reported and skipped.
directories = ["images/extracted", "images/pages"]

# ---------------------------------------------------------------------------
# WebP encoding
# ---------------------------------------------------------------------------
[webp]
# Lossy quality (0 = worst, 100 = best).
quality = 85

# Compression effort (0 = fastest, 6 = slowest with the smallest files).
method = 6

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Seconds a single file may spend decoding and encoding before it is
# recorded as failed. 0 disables the limit.
file_timeout_secs = 300
"##
}
