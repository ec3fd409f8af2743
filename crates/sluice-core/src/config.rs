//! Configuration module for Sluice Core.

use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::error::Result;
use crate::gate::EnforcementAction;

/// Streamer configuration section in the config file.
///
/// Intervals are stored in milliseconds so TOML stays integer-only; use the
/// `Duration` accessors from code.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct StreamerConfig {
    /// Maximum events fetched per tail poll, and the size-triggered flush threshold.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Maximum time buffered events may wait before a flush (milliseconds).
    #[serde(default = "default_flush_interval_ms")]
    pub flush_interval_ms: u64,
    /// Idle time before a keepalive frame is emitted (milliseconds).
    #[serde(default = "default_keepalive_interval_ms")]
    pub keepalive_interval_ms: u64,
    /// Poll interval floor (milliseconds).
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Poll interval ceiling under backoff (milliseconds).
    #[serde(default = "default_max_poll_interval_ms")]
    pub max_poll_interval_ms: u64,
    /// Multiplier applied to the poll interval on each idle iteration.
    #[serde(default = "default_poll_backoff_factor")]
    pub poll_backoff_factor: f64,
    /// Hard ceiling on events emitted over one stream's lifetime.
    #[serde(default = "default_max_events_per_stream")]
    pub max_events_per_stream: u64,
    /// Page size for the historical catch-up phase.
    #[serde(default = "default_catchup_page_size")]
    pub catchup_page_size: usize,
}

fn default_batch_size() -> usize {
    10
}

fn default_flush_interval_ms() -> u64 {
    500
}

fn default_keepalive_interval_ms() -> u64 {
    30_000
}

fn default_poll_interval_ms() -> u64 {
    100
}

fn default_max_poll_interval_ms() -> u64 {
    2_000
}

fn default_poll_backoff_factor() -> f64 {
    1.5
}

fn default_max_events_per_stream() -> u64 {
    10_000
}

fn default_catchup_page_size() -> usize {
    100
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            flush_interval_ms: default_flush_interval_ms(),
            keepalive_interval_ms: default_keepalive_interval_ms(),
            poll_interval_ms: default_poll_interval_ms(),
            max_poll_interval_ms: default_max_poll_interval_ms(),
            poll_backoff_factor: default_poll_backoff_factor(),
            max_events_per_stream: default_max_events_per_stream(),
            catchup_page_size: default_catchup_page_size(),
        }
    }
}

impl StreamerConfig {
    /// Maximum time buffered events may wait before a flush.
    #[must_use]
    pub fn flush_interval(&self) -> Duration {
        Duration::from_millis(self.flush_interval_ms)
    }

    /// Idle time before a keepalive frame is emitted.
    #[must_use]
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_millis(self.keepalive_interval_ms)
    }

    /// Poll interval floor.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Poll interval ceiling under backoff.
    #[must_use]
    pub fn max_poll_interval(&self) -> Duration {
        Duration::from_millis(self.max_poll_interval_ms)
    }
}

/// Evidence gate configuration section in the config file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct GateConfig {
    /// Maximum characters buffered while a hold is open.
    #[serde(default = "default_max_buffer_chars")]
    pub max_buffer_chars: usize,
    /// Optional enforcement action override applied to every evaluation.
    #[serde(default)]
    pub default_action: Option<EnforcementAction>,
}

fn default_max_buffer_chars() -> usize {
    64 * 1024
}

impl Default for GateConfig {
    fn default() -> Self {
        Self { max_buffer_chars: default_max_buffer_chars(), default_action: None }
    }
}

/// Root configuration for Sluice.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
pub struct Config {
    /// Streamer configuration.
    #[serde(default)]
    pub streamer: StreamerConfig,
    /// Gate configuration.
    #[serde(default)]
    pub gate: GateConfig,
}

impl Config {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse configuration from a TOML string.
    ///
    /// # Errors
    /// Returns an error if the TOML is malformed.
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }
}
