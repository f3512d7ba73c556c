//! # Hermes Pipeline
//!
//! Typed request dispatch through a fixed-order behavior pipeline.
//!
//! ```text
//! caller → Dispatcher → Logging → Validation → Handler
//!                          ↑           ↑           │
//!        response/error ←──┴───────────┴───────────┘
//! ```
//!
//! - [`Dispatcher`] - Resolves the handler and runs the pipeline
//! - [`Behavior`] / [`Next`] - A stage and its continuation
//! - [`Pipeline`] - The immutable, ordered list of stages
//! - [`stages`] - The logging and validation stages

#![doc(html_root_url = "https://docs.rs/hermes-pipeline/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod behavior;
pub mod dispatcher;
pub mod pipeline;
pub mod stages;

pub use behavior::{Behavior, Next};
pub use dispatcher::{Dispatcher, DispatcherBuilder};
pub use pipeline::{BoxedBehavior, Pipeline, PipelineBuilder, Stage};
pub use stages::{
    DispatchEvent, DispatchOutcome, DispatchSink, LoggingBehavior, RecordingSink, Rejection,
    TracingSink, ValidationBehavior, DEFAULT_SLOW_THRESHOLD,
};
