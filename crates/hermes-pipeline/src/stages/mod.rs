//! Core pipeline stages.
//!
//! The two stages run in a fixed order around every handler invocation:
//!
//! 1. [`logging`] - Emit start, completion and failure events with timing
//! 2. [`validation`] - Run the request type's validators, halt on failure

pub mod logging;
pub mod validation;

pub use logging::{
    DispatchEvent, DispatchOutcome, DispatchSink, LoggingBehavior, RecordingSink, TracingSink,
    DEFAULT_SLOW_THRESHOLD,
};
pub use validation::{Rejection, ValidationBehavior};
