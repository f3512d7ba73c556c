//! # Hermes
//!
//! **Typed request dispatch with a fixed behavior pipeline**
//!
//! A request value is routed to exactly one handler, passing first through
//! a logging stage and a validation stage the handler never sees:
//!
//! ```text
//! Dispatcher → Logging → Validation → Handler
//!                                        ↓
//! caller ← Logging ← Validation ←────────┘
//! ```
//!
//! - Validation failures stop the request before its handler
//! - A missing entity is reported as `NotFound`, ahead of field failures
//! - Every dispatch emits one start event and one completion or failure event
//!
//! ## Quick Start
//!
//! ```
//! use hermes::prelude::*;
//!
//! struct Greet(String);
//!
//! impl Request for Greet {
//!     type Response = String;
//! }
//!
//! # tokio_test::block_on(async {
//! let dispatcher = Dispatcher::builder()
//!     .handler::<Greet, _>(FnHandler::new(|_ctx, g: Greet| async move {
//!         Ok(format!("Hello, {}!", g.0))
//!     }))
//!     .validator::<Greet>(RuleSet::new().not_empty("Name", |g: &Greet| g.0.as_str()))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(dispatcher.send(Greet("Ada".into())).await.unwrap(), "Hello, Ada!");
//! assert!(dispatcher.send(Greet(String::new())).await.is_err());
//! # });
//! ```

#![doc(html_root_url = "https://docs.rs/hermes/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod bootstrap;

pub use bootstrap::{bootstrap, BootstrapError};

// Re-export core types
pub use hermes_core as core;

// Re-export the pipeline
pub use hermes_pipeline as pipeline;

// Re-export telemetry
pub use hermes_telemetry as telemetry;

// Re-export configuration
pub use hermes_config as config;

// Re-export the users domain
pub use hermes_users as users;

pub use hermes_pipeline::{Dispatcher, DispatcherBuilder};

/// Prelude module for convenient imports.
pub mod prelude {
    pub use hermes_core::{
        BoxFuture, CancellationSignal, DispatchContext, ErrorCategory, FieldFailure, FnHandler,
        Handler, HermesError, HermesResult, Request, RequestId, RuleSet, ValidationFailure,
        Validator,
    };

    pub use hermes_pipeline::{DispatchSink, Dispatcher, DispatcherBuilder, TracingSink};

    pub use hermes_config::{ConfigLoader, HermesConfig};

    pub use hermes_telemetry::{Telemetry, TelemetrySink};

    pub use crate::{bootstrap, BootstrapError};
}
