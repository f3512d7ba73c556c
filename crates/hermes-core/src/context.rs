//! Dispatch context types.
//!
//! The [`DispatchContext`] accompanies a request through every behavior and
//! into the handler and validators. It is immutable for the lifetime of one
//! dispatch.

use crate::cancel::CancellationSignal;
use crate::HermesResult;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A unique identifier for each dispatch, using UUID v7.
///
/// UUID v7 is time-ordered, which makes it ideal for log correlation.
///
/// # Example
///
/// ```
/// use hermes_core::RequestId;
///
/// let id = RequestId::new();
/// assert_eq!(id.to_string().len(), 36);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(Uuid);

impl RequestId {
    /// Creates a new unique request ID using UUID v7.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }

    /// Creates a `RequestId` from an existing UUID, e.g. one propagated by a
    /// transport header.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<Uuid> for RequestId {
    fn from(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

/// Per-dispatch context.
///
/// Carries the request ID used for log correlation and the caller's
/// [`CancellationSignal`].
///
/// # Example
///
/// ```
/// use hermes_core::{CancellationSignal, DispatchContext};
///
/// let signal = CancellationSignal::new();
/// let ctx = DispatchContext::new().with_cancellation(signal.clone());
///
/// signal.cancel();
/// assert!(ctx.is_cancelled());
/// ```
#[derive(Debug, Clone, Default)]
pub struct DispatchContext {
    request_id: RequestId,
    cancellation: CancellationSignal,
}

impl DispatchContext {
    /// Creates a context with a fresh request ID and an untriggered signal.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a context with the specified request ID.
    #[must_use]
    pub fn with_request_id(request_id: RequestId) -> Self {
        Self {
            request_id,
            cancellation: CancellationSignal::new(),
        }
    }

    /// Returns a new context observing the given cancellation signal.
    #[must_use]
    pub fn with_cancellation(mut self, cancellation: CancellationSignal) -> Self {
        self.cancellation = cancellation;
        self
    }

    /// Returns the request ID.
    #[must_use]
    pub const fn request_id(&self) -> RequestId {
        self.request_id
    }

    /// Returns the cancellation signal.
    #[must_use]
    pub const fn cancellation(&self) -> &CancellationSignal {
        &self.cancellation
    }

    /// Returns `true` if the caller cancelled this dispatch.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Fails with [`HermesError::Cancelled`](crate::HermesError::Cancelled)
    /// if the caller cancelled this dispatch.
    pub fn ensure_active(&self) -> HermesResult<()> {
        self.cancellation.ensure_active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_id_new_generates_unique_ids() {
        let id1 = RequestId::new();
        let id2 = RequestId::new();
        assert_ne!(id1, id2, "Each RequestId should be unique");
    }

    #[test]
    fn test_request_id_serde_is_transparent() {
        let id = RequestId::new();
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn test_context_with_request_id() {
        let id = RequestId::new();
        let ctx = DispatchContext::with_request_id(id);
        assert_eq!(ctx.request_id(), id);
        assert!(!ctx.is_cancelled());
    }

    #[test]
    fn test_context_clones_share_cancellation() {
        let ctx = DispatchContext::new();
        let clone = ctx.clone();

        ctx.cancellation().cancel();

        assert!(clone.is_cancelled());
        assert!(clone.ensure_active().is_err());
    }
}
