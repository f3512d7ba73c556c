//! Observability for the Hermes dispatch pipeline.
//!
//! - **Logging**: `tracing-subscriber` with JSON or pretty output
//! - **Metrics**: Prometheus-format metrics via the `metrics` crate
//! - **Sink**: [`TelemetrySink`], the dispatch sink that feeds both
//!
//! # Example
//!
//! ```rust,ignore
//! use hermes_pipeline::Dispatcher;
//! use hermes_telemetry::{init_telemetry, TelemetryConfig};
//!
//! let telemetry = init_telemetry(&TelemetryConfig::default())?;
//! let dispatcher = Dispatcher::builder()
//!     .sink(telemetry.sink())
//!     .build()?;
//! ```
//!
//! # Metrics Endpoint
//!
//! ```text
//! # TYPE hermes_dispatch_total counter
//! hermes_dispatch_total{request="GetUserQuery",outcome="ok"} 1234
//! hermes_dispatch_total{request="GetUserQuery",outcome="not_found"} 56
//! ```

pub mod config;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod sink;

pub use config::{TelemetryConfig, TelemetryConfigBuilder};
pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};
pub use metrics::{init_metrics, render_metrics, MetricsConfig};
pub use sink::TelemetrySink;

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;

/// Initialized telemetry.
///
/// Hands out [`TelemetrySink`]s for dispatchers built after initialization.
#[derive(Debug, Clone)]
pub struct Telemetry {
    config: TelemetryConfig,
}

impl Telemetry {
    /// Returns a dispatch sink configured from the telemetry settings.
    #[must_use]
    pub fn sink(&self) -> TelemetrySink {
        TelemetrySink::new().with_slow_threshold(self.config.slow_threshold)
    }

    /// Returns the configuration telemetry was initialized with.
    #[must_use]
    pub const fn config(&self) -> &TelemetryConfig {
        &self.config
    }

    /// Renders the metrics, if enabled.
    #[must_use]
    pub fn render_metrics(&self) -> Option<String> {
        render_metrics()
    }
}

/// Initializes logging and metrics.
///
/// Can succeed only once per process, since both install global state.
pub fn init_telemetry(config: &TelemetryConfig) -> TelemetryResult<Telemetry> {
    init_logging(&config.logging)?;
    init_metrics(&config.metrics)?;

    tracing::info!(
        service = %config.service_name,
        environment = %config.environment,
        log_format = config.logging.format.as_str(),
        metrics = config.metrics.enabled,
        "telemetry initialized"
    );

    Ok(Telemetry {
        config: config.clone(),
    })
}
