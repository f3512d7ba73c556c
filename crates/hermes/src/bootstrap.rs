//! Process start-up from configuration.

use hermes_config::{ConfigError, HermesConfig};
use hermes_telemetry::{init_telemetry, Telemetry, TelemetryError};
use thiserror::Error;

/// Errors raised while starting up.
#[derive(Debug, Error)]
pub enum BootstrapError {
    /// The configuration is invalid.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Logging or metrics could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Validates `config` and installs logging and metrics from it.
///
/// The returned [`Telemetry`] hands out sinks for
/// [`DispatcherBuilder::sink`](hermes_pipeline::DispatcherBuilder::sink).
///
/// ```rust,ignore
/// use hermes::{bootstrap, Dispatcher};
/// use hermes_config::ConfigLoader;
///
/// let config = ConfigLoader::new().with_env_prefix("HERMES").load()?;
/// let telemetry = bootstrap(&config)?;
/// let dispatcher = hermes::users::register(Dispatcher::builder(), store)
///     .sink(telemetry.sink())
///     .build()?;
/// ```
pub fn bootstrap(config: &HermesConfig) -> Result<Telemetry, BootstrapError> {
    config.validate()?;
    let telemetry = init_telemetry(&config.telemetry())?;

    tracing::debug!(
        slow_threshold_ms = config.dispatch.slow_threshold_ms,
        "dispatch telemetry ready"
    );
    Ok(telemetry)
}
