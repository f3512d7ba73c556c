//! Configuration sections.

use serde::{Deserialize, Serialize};

/// Service identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Service name, attached to the startup log line.
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Environment (development, staging, production).
    #[serde(default = "default_environment")]
    pub environment: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            environment: default_environment(),
        }
    }
}

fn default_service_name() -> String {
    "hermes".to_string()
}

fn default_environment() -> String {
    "development".to_string()
}

/// Dispatch pipeline settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Successful dispatches slower than this log at `warn`. 0 disables it.
    #[serde(default = "default_slow_threshold_ms")]
    pub slow_threshold_ms: u64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            slow_threshold_ms: default_slow_threshold_ms(),
        }
    }
}

fn default_slow_threshold_ms() -> u64 {
    500
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable output.
    Pretty,
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Enable logging.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Filter directive (e.g. `"info"` or `"hermes_pipeline=debug,warn"`).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format.
    #[serde(default)]
    pub format: LogFormat,

    /// Colour the pretty output.
    #[serde(default)]
    pub ansi_enabled: bool,

    /// Include file and line in each event.
    #[serde(default)]
    pub include_location: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            level: default_log_level(),
            format: LogFormat::default(),
            ansi_enabled: false,
            include_location: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct MetricsConfig {
    /// Install the Prometheus recorder.
    #[serde(default)]
    pub enabled: bool,

    /// Scrape endpoint address.
    #[serde(default = "default_metrics_addr")]
    pub addr: String,

    /// Serve the scrape endpoint. Off means recorder only.
    #[serde(default)]
    pub listen: bool,

    /// Histogram buckets for dispatch latency, in seconds.
    #[serde(default = "default_histogram_buckets")]
    pub histogram_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: default_metrics_addr(),
            listen: false,
            histogram_buckets: default_histogram_buckets(),
        }
    }
}

fn default_metrics_addr() -> String {
    "0.0.0.0:9090".to_string()
}

fn default_histogram_buckets() -> Vec<f64> {
    vec![
        0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
    ]
}

fn default_true() -> bool {
    true
}
