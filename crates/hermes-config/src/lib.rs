//! Typed configuration for Hermes services.
//!
//! - TOML and JSON configuration files
//! - Environment variable overrides (`HERMES__SECTION__KEY`)
//! - `.env` files via `dotenvy`
//! - Strict validation (unknown fields are errors)
//!
//! # Example
//!
//! ```no_run
//! use hermes_config::ConfigLoader;
//!
//! # fn main() -> Result<(), hermes_config::ConfigError> {
//! let config = ConfigLoader::new()
//!     .with_file("hermes.toml")?
//!     .with_env_prefix("HERMES")
//!     .load()?;
//!
//! println!("slow threshold: {:?}", config.slow_threshold());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration File Format
//!
//! ```toml
//! [service]
//! name = "users"
//! environment = "production"
//!
//! [dispatch]
//! slow_threshold_ms = 500
//!
//! [logging]
//! enabled = true
//! level = "info"
//! format = "json"
//!
//! [metrics]
//! enabled = true
//! addr = "0.0.0.0:9090"
//! listen = true
//! ```

mod config;
mod error;
mod loader;
mod schema;

pub use config::HermesConfig;
pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::{DispatchConfig, LogFormat, LoggingConfig, MetricsConfig, ServiceConfig};
