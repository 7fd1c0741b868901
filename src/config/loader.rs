//! Configuration file loading with precedence handling.

use crate::store::cache::DEFAULT_CAPACITY;
use crate::viewport::ViewportOptions;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;
use tracing::warn;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "LOGVIEW_CONFIG";
/// Environment override for `strip_styling`.
pub const STRIP_STYLING_ENV: &str = "LOGVIEW_STRIP_STYLING";
/// Environment override for `cache_capacity`.
pub const CACHE_CAPACITY_ENV: &str = "LOGVIEW_CACHE_CAPACITY";

/// Errors that can occur during config loading.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Failed to read config file (permissions, not a regular file).
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError {
        /// Path that failed to read.
        path: PathBuf,
        /// Reason for failure.
        reason: String,
    },

    /// Config file contains invalid TOML or unknown keys.
    #[error("Invalid TOML in {path}: {reason}")]
    ParseError {
        /// Path with invalid TOML.
        path: PathBuf,
        /// Parse error details.
        reason: String,
    },
}

/// TOML configuration file structure.
///
/// Every key is optional. Corresponds to `~/.config/logview/config.toml`.
///
/// ```toml
/// cache_capacity = 20000
/// estimated_height = 1.0
/// buffer_count = 8
/// scroll_debounce_ms = 16
/// worker_threads = 4
/// strip_styling = false
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    /// Highlight cache capacity in entries.
    #[serde(default)]
    pub cache_capacity: Option<usize>,

    /// Row extent assumed before measurement.
    #[serde(default)]
    pub estimated_height: Option<f64>,

    /// Rows bound beyond each viewport edge.
    #[serde(default)]
    pub buffer_count: Option<usize>,

    /// Debounce window for scroll-triggered renders, in milliseconds.
    #[serde(default)]
    pub scroll_debounce_ms: Option<u64>,

    /// Tokenizer threads. Zero tokenizes inline on the render thread.
    #[serde(default)]
    pub worker_threads: Option<usize>,

    /// Start with ANSI styling stripped.
    #[serde(default)]
    pub strip_styling: Option<bool>,

    /// Distance from the end still counted as pinned to the bottom.
    #[serde(default)]
    pub bottom_tolerance: Option<f64>,

    /// Smallest measurement change recorded in the height cache.
    #[serde(default)]
    pub measure_tolerance: Option<f64>,

    /// Path to log file for tracing output.
    #[serde(default)]
    pub log_file_path: Option<PathBuf>,
}

/// Resolved configuration after applying precedence rules.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedConfig {
    /// Highlight cache capacity in entries.
    pub cache_capacity: usize,
    /// Row extent assumed before measurement.
    pub estimated_height: f64,
    /// Rows bound beyond each viewport edge.
    pub buffer_count: usize,
    /// Debounce window for scroll-triggered renders.
    pub scroll_debounce: Duration,
    /// Tokenizer threads. Zero tokenizes inline.
    pub worker_threads: usize,
    /// Start with ANSI styling stripped.
    pub strip_styling: bool,
    /// Distance from the end still counted as pinned to the bottom.
    pub bottom_tolerance: f64,
    /// Smallest measurement change recorded in the height cache.
    pub measure_tolerance: f64,
    /// Where tracing output is written.
    pub log_file_path: PathBuf,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        let viewport = ViewportOptions::default();
        Self {
            cache_capacity: DEFAULT_CAPACITY,
            estimated_height: viewport.estimated_height,
            buffer_count: viewport.buffer_count,
            scroll_debounce: viewport.scroll_debounce,
            worker_threads: default_worker_threads(),
            strip_styling: false,
            bottom_tolerance: viewport.bottom_tolerance,
            measure_tolerance: viewport.measure_tolerance,
            log_file_path: default_log_path(),
        }
    }
}

impl ResolvedConfig {
    /// Viewport tuning carried by this config.
    pub fn viewport_options(&self) -> ViewportOptions {
        ViewportOptions {
            estimated_height: self.estimated_height,
            buffer_count: self.buffer_count,
            scroll_debounce: self.scroll_debounce,
            bottom_tolerance: self.bottom_tolerance,
            measure_tolerance: self.measure_tolerance,
        }
    }
}

fn default_worker_threads() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get().clamp(1, 4))
        .unwrap_or(2)
}

/// Resolve default log file path.
///
/// `~/.local/state/logview/logview.log` on Linux, the platform state
/// directory elsewhere, or `logview.log` in the current directory when no
/// state directory exists.
pub fn default_log_path() -> PathBuf {
    match dirs::state_dir() {
        Some(state_dir) => state_dir.join("logview").join("logview.log"),
        None => PathBuf::from("logview.log"),
    }
}

/// Resolve default config file path: `<config dir>/logview/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("logview").join("config.toml"))
}

/// Load configuration file from a specific path.
///
/// Returns `Ok(None)` if the file doesn't exist.
///
/// # Errors
///
/// Returns error if the file exists but has read or parse errors.
pub fn load_config_file(path: impl Into<PathBuf>) -> Result<Option<ConfigFile>, ConfigError> {
    let path = path.into();
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path).map_err(|e| ConfigError::ReadError {
        path: path.clone(),
        reason: e.to_string(),
    })?;

    toml::from_str(&contents)
        .map(Some)
        .map_err(|e| ConfigError::ParseError {
            path,
            reason: e.to_string(),
        })
}

/// Load configuration with precedence handling.
///
/// The first of these that is set decides which file is read:
/// 1. Explicit `config_path` (CLI `--config`)
/// 2. `LOGVIEW_CONFIG` environment variable
/// 3. [`default_config_path`]
///
/// # Errors
///
/// Only when the chosen file exists but cannot be read or parsed.
pub fn load_config_with_precedence(
    config_path: Option<PathBuf>,
) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = config_path {
        return load_config_file(path);
    }
    if let Ok(env_path) = std::env::var(CONFIG_ENV) {
        return load_config_file(PathBuf::from(env_path));
    }
    match default_config_path() {
        Some(default_path) => load_config_file(default_path),
        None => Ok(None),
    }
}

/// Merge config file into defaults.
pub fn merge_config(config_file: Option<ConfigFile>) -> ResolvedConfig {
    let defaults = ResolvedConfig::default();
    let Some(config) = config_file else {
        return defaults;
    };

    ResolvedConfig {
        cache_capacity: config.cache_capacity.unwrap_or(defaults.cache_capacity),
        estimated_height: config
            .estimated_height
            .filter(|h| h.is_finite() && *h > 0.0)
            .unwrap_or(defaults.estimated_height),
        buffer_count: config.buffer_count.unwrap_or(defaults.buffer_count),
        scroll_debounce: config
            .scroll_debounce_ms
            .map(Duration::from_millis)
            .unwrap_or(defaults.scroll_debounce),
        worker_threads: config.worker_threads.unwrap_or(defaults.worker_threads),
        strip_styling: config.strip_styling.unwrap_or(defaults.strip_styling),
        bottom_tolerance: config
            .bottom_tolerance
            .unwrap_or(defaults.bottom_tolerance),
        measure_tolerance: config
            .measure_tolerance
            .unwrap_or(defaults.measure_tolerance),
        log_file_path: config.log_file_path.unwrap_or(defaults.log_file_path),
    }
}

/// Apply `LOGVIEW_*` environment overrides.
///
/// Unparseable values are ignored with a warning.
pub fn apply_env_overrides(config: ResolvedConfig) -> ResolvedConfig {
    apply_env_values(
        config,
        std::env::var(STRIP_STYLING_ENV).ok().as_deref(),
        std::env::var(CACHE_CAPACITY_ENV).ok().as_deref(),
    )
}

fn apply_env_values(
    mut config: ResolvedConfig,
    strip_styling: Option<&str>,
    cache_capacity: Option<&str>,
) -> ResolvedConfig {
    if let Some(raw) = strip_styling {
        match parse_flag(raw) {
            Some(value) => config.strip_styling = value,
            None => warn!(value = raw, "ignoring invalid {STRIP_STYLING_ENV}"),
        }
    }
    if let Some(raw) = cache_capacity {
        match raw.trim().parse() {
            Ok(value) => config.cache_capacity = value,
            Err(_) => warn!(value = raw, "ignoring invalid {CACHE_CAPACITY_ENV}"),
        }
    }
    config
}

fn parse_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// Flags that were explicitly given on the command line.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CliOverrides {
    /// `--strip-styling`, when given.
    pub strip_styling: Option<bool>,
    /// `--workers`, when given.
    pub worker_threads: Option<usize>,
    /// Log file override.
    pub log_file_path: Option<PathBuf>,
}

/// Apply CLI argument overrides. Highest precedence.
pub fn apply_cli_overrides(mut config: ResolvedConfig, cli: CliOverrides) -> ResolvedConfig {
    if let Some(strip_styling) = cli.strip_styling {
        config.strip_styling = strip_styling;
    }
    if let Some(worker_threads) = cli.worker_threads {
        config.worker_threads = worker_threads;
    }
    if let Some(path) = cli.log_file_path {
        config.log_file_path = path;
    }
    config
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
