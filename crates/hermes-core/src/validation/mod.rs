//! Validation engine.
//!
//! Validators inspect a request before its handler runs and report failures
//! rather than raising them. The validation behavior aggregates the failures of
//! every validator registered for a request type into a [`ValidationReport`]
//! and classifies the report with [`ValidationReport::into_result`]:
//!
//! - an empty report lets the dispatch proceed;
//! - any [`ValidationFailure::NotFound`] wins, and becomes
//!   [`HermesError::NotFound`] carrying the first such message;
//! - otherwise every [`ValidationFailure::Invalid`] is reported, in order, as
//!   [`HermesError::Validation`].

mod rules;

pub use rules::RuleSet;

use std::any::Any;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::request::{BoxFuture, Message, Request, RequestDescriptor};
use crate::{DispatchContext, HermesError, HermesResult};

/// A single failing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldFailure {
    /// Name of the offending field, e.g. `"GivenNames"`.
    pub field: String,
    /// Human-readable description.
    pub message: String,
}

impl FieldFailure {
    /// Creates a field failure.
    #[must_use]
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// One validation failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationFailure {
    /// The input is malformed or semantically invalid.
    Invalid(FieldFailure),
    /// The entity referenced by the request does not exist.
    NotFound {
        /// Human-readable description.
        message: String,
    },
}

impl ValidationFailure {
    /// Creates a field failure.
    #[must_use]
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid(FieldFailure::new(field, message))
    }

    /// Creates a not-found failure.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Returns `true` for [`ValidationFailure::NotFound`].
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns the failure message.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::Invalid(failure) => &failure.message,
            Self::NotFound { message } => message,
        }
    }

    /// Returns the label used in logs and metrics (`invalid` or `not_found`).
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Invalid(_) => "invalid",
            Self::NotFound { .. } => "not_found",
        }
    }
}

/// Ordered collection of failures produced by the validators of one request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    /// Creates an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one failure.
    pub fn push(&mut self, failure: ValidationFailure) {
        self.failures.push(failure);
    }

    /// Returns `true` if no failure was reported.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    /// Returns the number of failures.
    #[must_use]
    pub fn len(&self) -> usize {
        self.failures.len()
    }

    /// Returns the failures in report order.
    #[must_use]
    pub fn failures(&self) -> &[ValidationFailure] {
        &self.failures
    }

    /// Classifies the report.
    ///
    /// ```
    /// use hermes_core::{HermesError, ValidationFailure, ValidationReport};
    ///
    /// let report: ValidationReport = vec![
    ///     ValidationFailure::invalid("Id", "'Id' must be greater than '0'."),
    ///     ValidationFailure::not_found("The user '42' could not be found."),
    /// ]
    /// .into_iter()
    /// .collect();
    ///
    /// assert!(matches!(report.into_result(), Err(HermesError::NotFound { .. })));
    /// ```
    pub fn into_result(self) -> HermesResult<()> {
        if self.failures.is_empty() {
            return Ok(());
        }

        let mut fields = Vec::with_capacity(self.failures.len());
        for failure in self.failures {
            match failure {
                ValidationFailure::NotFound { message } => {
                    return Err(HermesError::NotFound { message });
                }
                ValidationFailure::Invalid(field) => fields.push(field),
            }
        }
        Err(HermesError::validation(fields))
    }
}

impl Extend<ValidationFailure> for ValidationReport {
    fn extend<T: IntoIterator<Item = ValidationFailure>>(&mut self, iter: T) {
        self.failures.extend(iter);
    }
}

impl FromIterator<ValidationFailure> for ValidationReport {
    fn from_iter<T: IntoIterator<Item = ValidationFailure>>(iter: T) -> Self {
        Self {
            failures: iter.into_iter().collect(),
        }
    }
}

/// Inspects a request of type `R` before its handler runs.
///
/// Validators report failures instead of returning errors. An `Err` is reserved
/// for the validator itself failing (a storage collaborator error, or
/// cancellation), and propagates unchanged.
pub trait Validator<R: Request>: Send + Sync + 'static {
    /// Validates the request.
    fn validate<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        request: &'a R,
    ) -> BoxFuture<'a, HermesResult<Vec<ValidationFailure>>>;
}

impl<R: Request, V: Validator<R>> Validator<R> for Arc<V> {
    fn validate<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        request: &'a R,
    ) -> BoxFuture<'a, HermesResult<Vec<ValidationFailure>>> {
        (**self).validate(ctx, request)
    }
}

/// Type-erased view over every validator registered for one request type.
pub trait ErasedValidators: Send + Sync + 'static {
    /// Describes the request type these validators accept.
    fn descriptor(&self) -> RequestDescriptor;

    /// Number of validators.
    fn len(&self) -> usize;

    /// Returns `true` if no validator is registered.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Runs every validator in registration order against the message.
    fn validate_message<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        message: &'a Message,
    ) -> BoxFuture<'a, HermesResult<ValidationReport>>;

    /// Used by registries to append to the typed set.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// The validators registered for request type `R`, in registration order.
pub struct ValidatorSet<R: Request> {
    validators: Vec<Box<dyn Validator<R>>>,
}

impl<R: Request> ValidatorSet<R> {
    /// Creates an empty set.
    #[must_use]
    pub fn new() -> Self {
        Self {
            validators: Vec::new(),
        }
    }

    /// Appends a validator.
    pub fn push(&mut self, validator: impl Validator<R>) {
        self.validators.push(Box::new(validator));
    }

    /// Runs every validator against a typed request.
    ///
    /// All validators run even when earlier ones reported failures. The
    /// cancellation signal is checked before each validator.
    pub async fn validate(&self, ctx: &DispatchContext, request: &R) -> HermesResult<ValidationReport> {
        let mut report = ValidationReport::new();
        for validator in &self.validators {
            ctx.ensure_active()?;
            report.extend(validator.validate(ctx, request).await?);
        }
        Ok(report)
    }
}

impl<R: Request> Default for ValidatorSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> ErasedValidators for ValidatorSet<R> {
    fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor::of::<R>()
    }

    fn len(&self) -> usize {
        self.validators.len()
    }

    fn validate_message<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        message: &'a Message,
    ) -> BoxFuture<'a, HermesResult<ValidationReport>> {
        Box::pin(async move {
            let request = message.downcast_ref::<R>().ok_or_else(|| {
                HermesError::internal(format!(
                    "validators for {} received {}",
                    RequestDescriptor::of::<R>().request_name(),
                    message.descriptor().request_name()
                ))
            })?;
            self.validate(ctx, request).await
        })
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
