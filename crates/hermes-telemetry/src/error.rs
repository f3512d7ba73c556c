//! Telemetry error types.

use thiserror::Error;

/// Errors that can occur while setting up telemetry.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// The metrics recorder could not be installed.
    #[error("Failed to initialize metrics: {0}")]
    MetricsInit(String),

    /// The logging subscriber could not be installed.
    #[error("Failed to initialize logging: {0}")]
    LoggingInit(String),

    /// The metrics listener address does not parse.
    #[error("Invalid address: {0}")]
    InvalidAddress(String),
}
