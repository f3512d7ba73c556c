//! Prometheus metrics for the dispatch pipeline.
//!
//! # Dispatch Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `hermes_dispatch_total` | Counter | `request`, `outcome` | Finished dispatches |
//! | `hermes_dispatch_duration_seconds` | Histogram | `request` | Pipeline latency |
//! | `hermes_validation_failures_total` | Counter | `request`, `kind` | Failures of requests rejected by validation |
//! | `hermes_in_flight_dispatches` | Gauge | - | Dispatches currently running |
//!
//! `outcome` is `"ok"` or the error category name (`"validation"`,
//! `"not_found"`, ...). `kind` is `"invalid"` or `"not_found"`; not-found
//! errors raised by handlers count under `hermes_dispatch_total` only.

use std::net::SocketAddr;
use std::sync::OnceLock;
use std::time::Duration;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

use crate::error::TelemetryError;
use crate::TelemetryResult;

/// Counter of finished dispatches.
pub const DISPATCH_TOTAL: &str = "hermes_dispatch_total";
/// Histogram of dispatch latency in seconds.
pub const DISPATCH_DURATION: &str = "hermes_dispatch_duration_seconds";
/// Counter of validation failures.
pub const VALIDATION_FAILURES: &str = "hermes_validation_failures_total";
/// Gauge of running dispatches.
pub const IN_FLIGHT: &str = "hermes_in_flight_dispatches";

static METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Metrics configuration.
#[derive(Debug, Clone)]
pub struct MetricsConfig {
    /// Whether metrics are enabled.
    pub enabled: bool,

    /// Scrape address (e.g. `"0.0.0.0:9090"`).
    pub addr: String,

    /// Whether to serve the scrape endpoint. Without it the recorder is
    /// installed and read through [`render_metrics`].
    pub listen: bool,

    /// Histogram buckets for [`DISPATCH_DURATION`].
    pub duration_buckets: Vec<f64>,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            addr: "0.0.0.0:9090".to_string(),
            listen: false,
            // 1ms .. 10s
            duration_buckets: vec![
                0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
            ],
        }
    }
}

impl MetricsConfig {
    /// Parses the scrape address.
    pub fn socket_addr(&self) -> TelemetryResult<SocketAddr> {
        self.addr
            .parse()
            .map_err(|e| TelemetryError::InvalidAddress(format!("{}: {e}", self.addr)))
    }
}

/// Installs the global Prometheus recorder.
///
/// With `listen` set the scrape endpoint is spawned onto the current tokio
/// runtime, which must exist. Does nothing when metrics are disabled.
pub fn init_metrics(config: &MetricsConfig) -> TelemetryResult<()> {
    if !config.enabled {
        return Ok(());
    }

    let addr = config.socket_addr()?;
    let builder = PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(DISPATCH_DURATION.to_string()),
            &config.duration_buckets,
        )
        .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;

    let handle = if config.listen {
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(TelemetryError::MetricsInit(
                "the metrics listener needs a running tokio runtime".to_string(),
            ));
        }
        let (recorder, exporter) = builder
            .with_http_listener(addr)
            .build()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        let handle = recorder.handle();
        metrics::set_global_recorder(recorder)
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?;
        tokio::spawn(async move {
            if let Err(error) = exporter.await {
                tracing::error!(?error, "metrics listener stopped");
            }
        });
        tracing::info!(%addr, "serving metrics");
        handle
    } else {
        builder
            .install_recorder()
            .map_err(|e| TelemetryError::MetricsInit(e.to_string()))?
    };

    let _ = METRICS_HANDLE.set(handle);
    describe_metrics();
    Ok(())
}

/// Returns the global handle if metrics are initialized.
pub fn metrics_handle() -> Option<&'static PrometheusHandle> {
    METRICS_HANDLE.get()
}

/// Renders the metrics in Prometheus text format.
///
/// Returns `None` if metrics are not initialized.
#[must_use]
pub fn render_metrics() -> Option<String> {
    METRICS_HANDLE.get().map(PrometheusHandle::render)
}

/// Registers descriptions for the dispatch metrics.
pub fn describe_metrics() {
    describe_counter!(DISPATCH_TOTAL, "Total number of finished dispatches");
    describe_histogram!(
        DISPATCH_DURATION,
        metrics::Unit::Seconds,
        "Time spent in the dispatch pipeline"
    );
    describe_counter!(
        VALIDATION_FAILURES,
        "Validation failures of rejected requests"
    );
    describe_gauge!(IN_FLIGHT, "Dispatches currently in the pipeline");
}

/// Records one finished dispatch.
pub fn record_dispatch(request: &str, outcome: &'static str, elapsed: Duration) {
    counter!(DISPATCH_TOTAL, "request" => request.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!(DISPATCH_DURATION, "request" => request.to_string())
        .record(elapsed.as_secs_f64());
}

/// Records the failures of one rejected request.
pub fn record_validation_failures(request: &str, kind: &'static str, count: u64) {
    if count == 0 {
        return;
    }
    counter!(VALIDATION_FAILURES, "request" => request.to_string(), "kind" => kind)
        .increment(count);
}

/// Increments the in-flight gauge.
pub fn increment_in_flight() {
    gauge!(IN_FLIGHT).increment(1.0);
}

/// Decrements the in-flight gauge.
pub fn decrement_in_flight() {
    gauge!(IN_FLIGHT).decrement(1.0);
}
