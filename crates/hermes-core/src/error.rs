//! Error taxonomy for Hermes.
//!
//! This module provides the [`HermesError`] type, the single failure type that
//! flows out of the dispatch pipeline. Every failure is classified into an
//! [`ErrorCategory`] so that a transport layer can map it onto its own status
//! model without inspecting messages.
//!
//! | `ErrorCategory` | Produced by | Caller can recover |
//! |---|---|---|
//! | `Validation` | validation behavior | yes, by correcting input |
//! | `NotFound` | validation behavior, handlers | yes |
//! | `Configuration` | dispatcher (no handler registered) | no |
//! | `Domain` | handlers and their collaborators | depends |
//! | `Cancelled` | any stage observing cancellation | n/a |
//! | `Internal` | erased pipeline type mismatch | no |
//!
//! Nothing in the pipeline retries. A failure is terminal for its dispatch.

use crate::validation::FieldFailure;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Result type alias using [`HermesError`].
pub type HermesResult<T> = Result<T, HermesError>;

/// Categories of errors for classification and handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Malformed or semantically invalid input.
    Validation,
    /// The referenced entity does not exist.
    NotFound,
    /// No handler is registered for the request type.
    Configuration,
    /// Business logic or storage failure raised by a handler.
    Domain,
    /// The caller cancelled the dispatch.
    Cancelled,
    /// A defect inside the pipeline itself.
    Internal,
}

impl ErrorCategory {
    /// Returns every category, in declaration order.
    #[must_use]
    pub const fn all() -> [Self; 6] {
        [
            Self::Validation,
            Self::NotFound,
            Self::Configuration,
            Self::Domain,
            Self::Cancelled,
            Self::Internal,
        ]
    }

    /// Returns `true` when the failure was caused by the caller.
    #[must_use]
    pub const fn is_client_error(self) -> bool {
        matches!(self, Self::Validation | Self::NotFound | Self::Cancelled)
    }

    /// Returns the `snake_case` label used in logs and metrics.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::Configuration => "configuration",
            Self::Domain => "domain",
            Self::Cancelled => "cancelled",
            Self::Internal => "internal",
        }
    }

    /// Returns the machine-readable error code used in error envelopes.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::Validation => "VALIDATION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Configuration => "HANDLER_NOT_FOUND",
            Self::Domain => "DOMAIN_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Internal => "INTERNAL_ERROR",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Standard error type for Hermes.
///
/// # Example
///
/// ```
/// use hermes_core::{ErrorCategory, FieldFailure, HermesError};
///
/// let error = HermesError::validation(vec![FieldFailure::new("GivenNames", "must not be empty")]);
/// assert_eq!(error.category(), ErrorCategory::Validation);
/// assert_eq!(error.field_failures().map(<[_]>::len), Some(1));
/// ```
#[derive(Error, Debug)]
pub enum HermesError {
    /// The request failed validation. Carries every failing field, in order.
    #[error("Validation failed: {}", summarize(.failures))]
    Validation {
        /// Ordered field failures.
        failures: Vec<FieldFailure>,
    },

    /// The entity referenced by the request does not exist.
    #[error("Not found: {message}")]
    NotFound {
        /// Human-readable error message.
        message: String,
    },

    /// No handler is registered for the request type.
    #[error("No handler registered for request type {request}")]
    HandlerNotFound {
        /// Name of the request type.
        request: String,
    },

    /// A handler's business logic or its collaborator failed.
    #[error("Domain error: {message}")]
    Domain {
        /// Human-readable error message.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<anyhow::Error>,
    },

    /// The dispatch was cancelled by the caller.
    #[error("Dispatch cancelled")]
    Cancelled,

    /// The pipeline itself is inconsistent.
    #[error("Internal error: {message}")]
    Internal {
        /// Human-readable error message.
        message: String,
    },
}

impl HermesError {
    /// Creates a validation error from ordered field failures.
    #[must_use]
    pub fn validation(failures: Vec<FieldFailure>) -> Self {
        Self::Validation { failures }
    }

    /// Creates a not found error.
    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    /// Creates a handler-not-found error for the named request type.
    #[must_use]
    pub fn handler_not_found(request: impl Into<String>) -> Self {
        Self::HandlerNotFound {
            request: request.into(),
        }
    }

    /// Creates a domain error.
    #[must_use]
    pub fn domain(message: impl Into<String>) -> Self {
        Self::Domain {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a domain error with a source error.
    pub fn domain_with_source(
        message: impl Into<String>,
        source: impl Into<anyhow::Error>,
    ) -> Self {
        Self::Domain {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Creates an internal error.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Returns the error category.
    #[must_use]
    pub const fn category(&self) -> ErrorCategory {
        match self {
            Self::Validation { .. } => ErrorCategory::Validation,
            Self::NotFound { .. } => ErrorCategory::NotFound,
            Self::HandlerNotFound { .. } => ErrorCategory::Configuration,
            Self::Domain { .. } => ErrorCategory::Domain,
            Self::Cancelled => ErrorCategory::Cancelled,
            Self::Internal { .. } => ErrorCategory::Internal,
        }
    }

    /// Returns `true` if this is a cancellation.
    #[must_use]
    pub const fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// Returns the field failures of a validation error.
    #[must_use]
    pub fn field_failures(&self) -> Option<&[FieldFailure]> {
        match self {
            Self::Validation { failures } => Some(failures),
            _ => None,
        }
    }

    /// Converts this error to a serializable error envelope.
    #[must_use]
    pub fn to_envelope(&self, request_id: Option<&str>) -> ErrorEnvelope {
        let category = self.category();
        ErrorEnvelope {
            error: ErrorDetail {
                code: category.code().to_string(),
                message: self.public_message(),
                category,
                details: self.error_details(),
            },
            request_id: request_id.map(ToString::to_string),
        }
    }

    // Domain and internal sources are never exposed to callers.
    fn public_message(&self) -> String {
        match self {
            Self::NotFound { message } => message.clone(),
            Self::Domain { message, .. } => message.clone(),
            _ => self.to_string(),
        }
    }

    fn error_details(&self) -> Option<serde_json::Value> {
        match self {
            Self::Validation { failures } => serde_json::to_value(failures).ok(),
            Self::HandlerNotFound { request } => Some(serde_json::json!({
                "request": request
            })),
            _ => None,
        }
    }
}

fn summarize(failures: &[FieldFailure]) -> String {
    failures
        .iter()
        .map(|failure| format!("{}: {}", failure.field, failure.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Serializable error envelope handed to transports.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    /// The error details.
    pub error: ErrorDetail,
    /// The request ID for correlation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

/// Error detail within an envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    /// Machine-readable error code.
    pub code: String,
    /// Human-readable error message.
    pub message: String,
    /// Error category.
    pub category: ErrorCategory,
    /// Additional error details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}
