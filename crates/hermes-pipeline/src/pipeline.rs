//! Fixed-order behavior pipeline.
//!
//! The pipeline is immutable once built. Its stages always run in [`Stage`]
//! order, whatever order the builder was configured in:
//!
//! 1. **Logging** - Start/completion/failure events and timing
//! 2. **Validation** - Registered validators for the request type
//!
//! The chain is folded at dispatch time from the last stage to the first, so
//! the first stage ends up outermost.

use std::sync::Arc;

use hermes_core::{DispatchContext, ErasedHandler, HermesResult, Message, Reply};

use crate::behavior::{Behavior, Next};
use crate::stages::{LoggingBehavior, ValidationBehavior};

/// A type-erased behavior that can be stored in a vector.
pub type BoxedBehavior = Arc<dyn Behavior>;

/// The fixed-order behavior pipeline.
///
/// # Example
///
/// ```
/// use hermes_pipeline::{LoggingBehavior, Pipeline, ValidationBehavior};
///
/// let pipeline = Pipeline::builder()
///     .validation(ValidationBehavior::default())
///     .logging(LoggingBehavior::default())
///     .build();
///
/// assert_eq!(pipeline.stage_names(), vec!["logging", "validation"]);
/// ```
#[derive(Clone, Default)]
pub struct Pipeline {
    stages: Vec<BoxedBehavior>,
}

impl Pipeline {
    /// Creates a new pipeline builder.
    #[must_use]
    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    /// Runs a message through every stage and into the handler.
    pub async fn run(
        &self,
        ctx: &DispatchContext,
        handler: &dyn ErasedHandler,
        message: Message,
    ) -> HermesResult<Reply> {
        self.build_chain(handler).run(ctx, message).await
    }

    fn build_chain<'a>(&'a self, handler: &'a dyn ErasedHandler) -> Next<'a> {
        let mut next = Next::handler(handler);
        for stage in self.stages.iter().rev() {
            next = Next::new(stage.as_ref(), next);
        }
        next
    }

    /// Returns the names of all stages in order.
    #[must_use]
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("stages", &self.stage_names())
            .finish()
    }
}

/// Builder for constructing a [`Pipeline`].
#[derive(Debug, Default)]
pub struct PipelineBuilder {
    logging: Option<LoggingBehavior>,
    validation: Option<ValidationBehavior>,
}

impl PipelineBuilder {
    /// Creates a builder with no stages.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the logging stage.
    #[must_use]
    pub fn logging(mut self, behavior: LoggingBehavior) -> Self {
        self.logging = Some(behavior);
        self
    }

    /// Sets the validation stage.
    #[must_use]
    pub fn validation(mut self, behavior: ValidationBehavior) -> Self {
        self.validation = Some(behavior);
        self
    }

    /// Builds the pipeline in [`Stage`] order.
    #[must_use]
    pub fn build(self) -> Pipeline {
        let mut stages: Vec<BoxedBehavior> = Vec::with_capacity(Stage::all().len());
        for stage in Stage::all() {
            match stage {
                Stage::Logging => {
                    if let Some(behavior) = &self.logging {
                        stages.push(Arc::new(behavior.clone()));
                    }
                }
                Stage::Validation => {
                    if let Some(behavior) = &self.validation {
                        stages.push(Arc::new(behavior.clone()));
                    }
                }
            }
        }
        Pipeline { stages }
    }
}

/// Pipeline stage marker for ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Stage {
    /// Stage 1: logging and timing
    Logging = 1,
    /// Stage 2: request validation
    Validation = 2,
}

impl Stage {
    /// Returns the stage name.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Logging => "logging",
            Self::Validation => "validation",
        }
    }

    /// Returns all stages in order.
    #[must_use]
    pub const fn all() -> [Self; 2] {
        [Self::Logging, Self::Validation]
    }
}
