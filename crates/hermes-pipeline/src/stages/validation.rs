//! Request validation behavior.
//!
//! Runs every validator registered for the exact request type and halts the
//! pipeline before the handler if any failure was reported. Request types
//! without validators pass straight through.
//!
//! # Pipeline Position
//!
//! ```text
//! Dispatcher → Logging → [Validation] → Handler
//! ```

use std::sync::Arc;

use hermes_core::{
    BoxFuture, DispatchContext, HermesError, HermesResult, Message, Reply, ValidationReport,
    ValidatorRegistry,
};

use crate::behavior::{Behavior, Next};
use crate::stages::logging::DispatchSink;

/// Why the validation stage turned a request away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Field failures only.
    Invalid {
        /// Number of field failures.
        failures: usize,
    },
    /// An existence check failed.
    NotFound,
}

impl Rejection {
    /// Classifies a non-empty report the way `into_result` will.
    #[must_use]
    pub fn of(report: &ValidationReport) -> Self {
        if report.failures().iter().any(|f| f.is_not_found()) {
            Self::NotFound
        } else {
            Self::Invalid {
                failures: report.len(),
            }
        }
    }

    /// Returns the label used in metrics (`invalid` or `not_found`).
    #[must_use]
    pub const fn kind(self) -> &'static str {
        match self {
            Self::Invalid { .. } => "invalid",
            Self::NotFound => "not_found",
        }
    }

    /// Number of failures the rejection counts for.
    #[must_use]
    pub const fn count(self) -> usize {
        match self {
            Self::Invalid { failures } => failures,
            Self::NotFound => 1,
        }
    }
}

/// The validation behavior.
#[derive(Clone, Default)]
pub struct ValidationBehavior {
    validators: Arc<ValidatorRegistry>,
    sink: Option<Arc<dyn DispatchSink>>,
}

impl ValidationBehavior {
    /// Creates a validation behavior over the given registry.
    #[must_use]
    pub fn new(validators: Arc<ValidatorRegistry>) -> Self {
        Self {
            validators,
            sink: None,
        }
    }

    /// Reports every rejection to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn DispatchSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// Returns the validator registry.
    #[must_use]
    pub fn validators(&self) -> &ValidatorRegistry {
        &self.validators
    }
}

impl std::fmt::Debug for ValidationBehavior {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationBehavior")
            .field("validators", &self.validators)
            .field("sink", &self.sink.is_some())
            .finish()
    }
}

impl Behavior for ValidationBehavior {
    fn name(&self) -> &'static str {
        "validation"
    }

    fn invoke<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        message: Message,
        next: Next<'a>,
    ) -> BoxFuture<'a, HermesResult<Reply>> {
        Box::pin(async move {
            let Some(validators) = self.validators.get(message.type_id()) else {
                return next.run(ctx, message).await;
            };

            let report = tokio::select! {
                biased;
                () = ctx.cancellation().cancelled() => Err(HermesError::Cancelled),
                report = validators.validate_message(ctx, &message) => report,
            }?;

            if !report.is_empty() {
                let request = message.descriptor().request_name();
                let rejection = Rejection::of(&report);
                tracing::debug!(
                    %request,
                    request_id = %ctx.request_id(),
                    failures = report.len(),
                    kind = rejection.kind(),
                    "request rejected by validation"
                );
                if let Some(sink) = &self.sink {
                    sink.rejected(&request, rejection);
                }
            }
            report.into_result()?;

            next.run(ctx, message).await
        })
    }
}
