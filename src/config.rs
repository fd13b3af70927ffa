//! Application configuration.
//!
//! Handles loading, validating, and merging `docfit.toml`. Stock defaults are
//! overridden by whatever keys the user file sets; a missing file means
//! "all defaults".
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [output]
//! filename_prefix = "resized_"  # output name = prefix + input stem + ".png"
//! # directory = "out"           # default: next to each input file
//!
//! [logging]
//! level = "info"                # console filter (RUST_LOG wins when set)
//! file_level = "debug"          # filter for the log file
//! # directory = "logs"          # write logs/app_<timestamp>.log
//!
//! [processing]
//! # max_processes = 4           # parallel workers (omit for auto = CPU cores)
//! max_decode_mb = 512           # refuse images needing more decoder memory
//! ```
//!
//! The category bounds are not configurable; they live in [`crate::bounds`].
//!
//! Unknown keys are rejected to catch typos early.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Configuration loaded from `docfit.toml`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    /// Where and how normalized PNGs are written.
    pub output: OutputConfig,
    /// Console and file log filters.
    pub logging: LoggingConfig,
    /// Worker count and decoder limits.
    pub processing: ProcessingConfig,
}

impl AppConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let prefix = &self.output.filename_prefix;
        if prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(format!(
                "output.filename_prefix must not contain path separators: {prefix:?}"
            )));
        }
        for (key, filter) in [
            ("logging.level", &self.logging.level),
            ("logging.file_level", &self.logging.file_level),
        ] {
            if let Err(e) = EnvFilter::try_new(filter) {
                return Err(ConfigError::Validation(format!(
                    "{key} is not a valid filter ({filter:?}): {e}"
                )));
            }
        }
        if self.processing.max_processes == Some(0) {
            return Err(ConfigError::Validation(
                "processing.max_processes must be at least 1".into(),
            ));
        }
        if self.processing.max_decode_mb == 0 {
            return Err(ConfigError::Validation(
                "processing.max_decode_mb must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Output file settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Prepended to the input file stem.
    pub filename_prefix: String,
    /// Directory for all outputs. When absent, each PNG lands next to its input.
    pub directory: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            filename_prefix: "resized_".to_string(),
            directory: None,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `EnvFilter` directive for console output.
    pub level: String,
    /// `EnvFilter` directive for the log file.
    pub file_level: String,
    /// When set, a timestamped log file is created in this directory.
    pub directory: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file_level: "debug".to_string(),
            directory: None,
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
    /// Decoder allocation limit in MiB.
    pub max_decode_mb: u64,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            max_processes: None,
            max_decode_mb: 512,
        }
    }
}

impl ProcessingConfig {
    pub fn max_decode_bytes(&self) -> u64 {
        self.max_decode_mb.saturating_mul(1024 * 1024)
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

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(AppConfig::default())
        .map_err(|e| ConfigError::Validation(format!("default config must serialize: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay replace base values entirely.
/// - Keys in base that are not in overlay are preserved.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Parse config text, merge it over the stock defaults, and validate.
pub fn parse_config(content: &str) -> Result<AppConfig, ConfigError> {
    let overlay: toml::Value = toml::from_str(content)?;
    let merged = merge_toml(stock_defaults_value()?, overlay);
    let config: AppConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Load config from `path`.
///
/// A missing file yields the stock defaults; an unreadable or invalid one is
/// an error.
pub fn load_config(path: &Path) -> Result<AppConfig, ConfigError> {
    if !path.exists() {
        return Ok(AppConfig::default());
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `docfit.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# docfit configuration
# ====================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults. Unknown keys cause an error.

# ---------------------------------------------------------------------------
# Output
# ---------------------------------------------------------------------------
[output]
# Output file name = prefix + input file stem + ".png".
filename_prefix = "resized_"

# Write every output into this directory instead of next to its input.
# directory = "out"

# ---------------------------------------------------------------------------
# Logging
# ---------------------------------------------------------------------------
[logging]
# Console filter, e.g. "info", "debug", "docfit=trace".
# The RUST_LOG environment variable takes precedence when set.
level = "info"

# Filter for the log file (only used when `directory` is set).
file_level = "debug"

# Create logs/app_<YYYYmmdd_HHMMSS>.log for each run.
# directory = "logs"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_processes = 4

# Refuse to decode images that would need more memory than this (MiB).
max_decode_mb = 512
"##
}
