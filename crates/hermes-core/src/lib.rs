//! # Hermes Core
//!
//! Core types and traits for the Hermes dispatch pipeline.
//!
//! This crate provides the foundational types used throughout Hermes:
//!
//! - [`Request`] - A typed request bound to its response type
//! - [`Handler`] - The business logic for exactly one request type
//! - [`Validator`] and [`RuleSet`] - Pre-handler input checks
//! - [`DispatchContext`] - Per-dispatch request ID and [`CancellationSignal`]
//! - [`HermesError`] - The classified failure every dispatch may produce
//! - [`HandlerRegistry`] and [`ValidatorRegistry`] - Type-keyed lookup tables

#![doc(html_root_url = "https://docs.rs/hermes-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod cancel;
mod context;
mod error;
pub mod handler;
pub mod registry;
pub mod request;
pub mod validation;

pub use cancel::CancellationSignal;
pub use context::{DispatchContext, RequestId};
pub use error::{ErrorCategory, ErrorDetail, ErrorEnvelope, HermesError, HermesResult};
pub use handler::{ErasedHandler, FnHandler, Handler, TypedHandler};
pub use registry::{HandlerRegistry, RegistryBuilder, RegistryError, ValidatorRegistry};
pub use request::{BoxFuture, Message, Reply, Request, RequestDescriptor};
pub use validation::{
    ErasedValidators, FieldFailure, RuleSet, ValidationFailure, ValidationReport, Validator,
    ValidatorSet,
};
