//! Top-level configuration.

use std::time::Duration;

use hermes_telemetry::{LogConfig, TelemetryConfig};
use serde::{Deserialize, Serialize};

use crate::{ConfigError, DispatchConfig, LogFormat, LoggingConfig, MetricsConfig, ServiceConfig};

/// Complete Hermes configuration.
///
/// Use [`ConfigLoader`](crate::ConfigLoader) to load it from files and
/// environment variables.
///
/// # Example
///
/// ```
/// use hermes_config::HermesConfig;
///
/// let config = HermesConfig::default();
/// assert_eq!(config.dispatch.slow_threshold_ms, 500);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(deny_unknown_fields)]
pub struct HermesConfig {
    /// Service identity.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Dispatch pipeline settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Metrics settings.
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl HermesConfig {
    /// Validates the configuration.
    ///
    /// Fails if the log level is not a valid filter directive, or if metrics
    /// are enabled with an unparsable address or no histogram buckets.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let Err(e) = hermes_telemetry::logging::create_env_filter(&self.logging.level) {
            return Err(ConfigError::invalid_value("logging.level", e.to_string()));
        }

        if self.metrics.enabled {
            if self.metrics.addr.parse::<std::net::SocketAddr>().is_err() {
                return Err(ConfigError::invalid_value(
                    "metrics.addr",
                    format!("invalid socket address: {}", self.metrics.addr),
                ));
            }
            if self.metrics.histogram_buckets.is_empty() {
                return Err(ConfigError::invalid_value(
                    "metrics.histogram_buckets",
                    "at least one bucket is required",
                ));
            }
        }

        Ok(())
    }

    /// Pretty `debug` logs with file and line.
    ///
    /// ```
    /// use hermes_config::{HermesConfig, LogFormat};
    ///
    /// let config = HermesConfig::development();
    /// assert_eq!(config.logging.format, LogFormat::Pretty);
    /// ```
    #[must_use]
    pub fn development() -> Self {
        let mut config = Self::default();
        config.service.environment = "development".to_string();
        config.logging.level = "debug".to_string();
        config.logging.format = LogFormat::Pretty;
        config.logging.ansi_enabled = true;
        config.logging.include_location = true;
        config
    }

    /// JSON `info` logs and metrics on.
    #[must_use]
    pub fn production() -> Self {
        let mut config = Self::default();
        config.service.environment = "production".to_string();
        config.logging.level = "info".to_string();
        config.logging.format = LogFormat::Json;
        config.logging.ansi_enabled = false;
        config.metrics.enabled = true;
        config
    }

    /// The slow threshold as a duration.
    #[must_use]
    pub const fn slow_threshold(&self) -> Duration {
        Duration::from_millis(self.dispatch.slow_threshold_ms)
    }

    /// Converts to the telemetry settings.
    #[must_use]
    pub fn telemetry(&self) -> TelemetryConfig {
        let format = match self.logging.format {
            LogFormat::Json => hermes_telemetry::LogFormat::Json,
            LogFormat::Pretty => hermes_telemetry::LogFormat::Pretty,
        };

        TelemetryConfig::builder()
            .service_name(&self.service.name)
            .environment(&self.service.environment)
            .slow_threshold(self.slow_threshold())
            .logging(LogConfig {
                enabled: self.logging.enabled,
                level: self.logging.level.clone(),
                format,
                ansi: self.logging.ansi_enabled,
                file_line_info: self.logging.include_location,
                include_target: true,
            })
            .metrics(hermes_telemetry::MetricsConfig {
                enabled: self.metrics.enabled,
                addr: self.metrics.addr.clone(),
                listen: self.metrics.listen,
                duration_buckets: self.metrics.histogram_buckets.clone(),
            })
            .build()
    }
}
