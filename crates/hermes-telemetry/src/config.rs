//! Telemetry configuration.

use std::time::Duration;

use hermes_pipeline::DEFAULT_SLOW_THRESHOLD;

use crate::logging::LogConfig;
use crate::metrics::MetricsConfig;

/// Configuration for logging, metrics and the dispatch sink.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    /// Service name, attached to the startup log line.
    pub service_name: String,

    /// Environment (production, staging, development).
    pub environment: String,

    /// Completions slower than this log at `warn`. Zero disables it.
    pub slow_threshold: Duration,

    /// Logging configuration.
    pub logging: LogConfig,

    /// Metrics configuration.
    pub metrics: MetricsConfig,
}

impl TelemetryConfig {
    /// Creates a new configuration builder.
    #[must_use]
    pub fn builder() -> TelemetryConfigBuilder {
        TelemetryConfigBuilder::new()
    }
}

impl Default for TelemetryConfig {
    fn default() -> Self {
        Self {
            service_name: "hermes".to_string(),
            environment: "development".to_string(),
            slow_threshold: DEFAULT_SLOW_THRESHOLD,
            logging: LogConfig::default(),
            metrics: MetricsConfig::default(),
        }
    }
}

/// Builder for [`TelemetryConfig`].
#[derive(Debug, Default)]
pub struct TelemetryConfigBuilder {
    config: TelemetryConfig,
}

impl TelemetryConfigBuilder {
    /// Creates a builder holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the service name.
    #[must_use]
    pub fn service_name(mut self, name: &str) -> Self {
        self.config.service_name = name.to_string();
        self
    }

    /// Sets the environment.
    #[must_use]
    pub fn environment(mut self, env: &str) -> Self {
        self.config.environment = env.to_string();
        self
    }

    /// Sets the slow threshold.
    #[must_use]
    pub fn slow_threshold(mut self, threshold: Duration) -> Self {
        self.config.slow_threshold = threshold;
        self
    }

    /// Sets the logging configuration.
    #[must_use]
    pub fn logging(mut self, config: LogConfig) -> Self {
        self.config.logging = config;
        self
    }

    /// Sets the metrics configuration.
    #[must_use]
    pub fn metrics(mut self, config: MetricsConfig) -> Self {
        self.config.metrics = config;
        self
    }

    /// Enables metrics on the given scrape address.
    #[must_use]
    pub fn metrics_addr(mut self, addr: &str) -> Self {
        self.config.metrics.enabled = true;
        self.config.metrics.addr = addr.to_string();
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> TelemetryConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::LogFormat;

    #[test]
    fn test_defaults() {
        let config = TelemetryConfig::default();
        assert_eq!(config.service_name, "hermes");
        assert_eq!(config.environment, "development");
        assert_eq!(config.slow_threshold, Duration::from_millis(500));
        assert!(!config.metrics.enabled);
    }

    #[test]
    fn test_builder() {
        let config = TelemetryConfig::builder()
            .service_name("users")
            .environment("production")
            .slow_threshold(Duration::from_secs(1))
            .logging(LogConfig::development())
            .metrics_addr("127.0.0.1:9100")
            .build();

        assert_eq!(config.service_name, "users");
        assert_eq!(config.environment, "production");
        assert_eq!(config.slow_threshold, Duration::from_secs(1));
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.addr, "127.0.0.1:9100");
    }
}
