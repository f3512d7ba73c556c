//! Handler and validator registries.
//!
//! Both registries are keyed by the request's [`TypeId`], assembled once at
//! startup and immutable afterwards. Resolution is a plain map lookup.
//!
//! ```
//! use hermes_core::{FnHandler, RegistryBuilder, Request};
//!
//! struct Ping;
//!
//! impl Request for Ping {
//!     type Response = &'static str;
//! }
//!
//! let registry = RegistryBuilder::new()
//!     .handler::<Ping, _>(FnHandler::new(|_ctx, _ping: Ping| async { Ok("pong") }))
//!     .build()
//!     .unwrap();
//!
//! assert!(registry.contains::<Ping>());
//! ```

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;

use crate::handler::{ErasedHandler, Handler, TypedHandler};
use crate::request::{Request, RequestDescriptor};
use crate::validation::{ErasedValidators, Validator, ValidatorSet};
use crate::{HermesError, HermesResult};

/// Startup-time registration errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A second handler was registered for the same request type.
    #[error("duplicate handler registration for request type {request}")]
    DuplicateHandler {
        /// Name of the request type.
        request: String,
    },
}

/// Maps each request type to its single handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<TypeId, Arc<dyn ErasedHandler>>,
}

impl HandlerRegistry {
    /// Resolves the handler for a request type.
    pub fn resolve(&self, descriptor: &RequestDescriptor) -> HermesResult<&dyn ErasedHandler> {
        self.handlers
            .get(&descriptor.type_id())
            .map(AsRef::as_ref)
            .ok_or_else(|| HermesError::handler_not_found(descriptor.request_name()))
    }

    /// Returns `true` if a handler is registered for `R`.
    #[must_use]
    pub fn contains<R: Request>(&self) -> bool {
        self.handlers.contains_key(&TypeId::of::<R>())
    }

    /// Number of registered handlers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Names of every registered request type, sorted.
    #[must_use]
    pub fn request_names(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .handlers
            .values()
            .map(|handler| handler.descriptor().request_name())
            .collect();
        names.sort();
        names
    }
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("requests", &self.request_names())
            .finish()
    }
}

/// The validators registered per request type.
#[derive(Default)]
pub struct ValidatorRegistry {
    validators: HashMap<TypeId, Box<dyn ErasedValidators>>,
}

impl ValidatorRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a validator for request type `R`.
    pub fn add<R: Request>(&mut self, validator: impl Validator<R>) {
        let entry = self
            .validators
            .entry(TypeId::of::<R>())
            .or_insert_with(|| Box::new(ValidatorSet::<R>::new()));
        if let Some(set) = entry.as_any_mut().downcast_mut::<ValidatorSet<R>>() {
            set.push(validator);
        }
    }

    /// Returns the validators for a request type, if any were registered.
    #[must_use]
    pub fn get(&self, type_id: TypeId) -> Option<&dyn ErasedValidators> {
        self.validators
            .get(&type_id)
            .map(AsRef::as_ref)
            .filter(|set| !set.is_empty())
    }

    /// Number of validators registered for `R`.
    #[must_use]
    pub fn count_for<R: Request>(&self) -> usize {
        self.get(TypeId::of::<R>()).map_or(0, |set| set.len())
    }
}

impl std::fmt::Debug for ValidatorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut counts: Vec<_> = self
            .validators
            .values()
            .map(|set| (set.descriptor().request_name(), set.len()))
            .collect();
        counts.sort();
        f.debug_struct("ValidatorRegistry")
            .field("validators", &counts)
            .finish()
    }
}

/// Collects handler registrations and rejects duplicates on [`build`](Self::build).
#[derive(Default)]
pub struct RegistryBuilder {
    handlers: HashMap<TypeId, Arc<dyn ErasedHandler>>,
    duplicates: Vec<String>,
}

impl RegistryBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for request type `R`.
    pub fn handler<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: Handler<R>,
    {
        self.register::<R, H>(handler);
        self
    }

    /// Registers the handler for request type `R` in place.
    pub fn register<R, H>(&mut self, handler: H)
    where
        R: Request,
        H: Handler<R>,
    {
        let descriptor = RequestDescriptor::of::<R>();
        if self.handlers.contains_key(&descriptor.type_id()) {
            self.duplicates.push(descriptor.request_name());
            return;
        }
        self.handlers
            .insert(descriptor.type_id(), Arc::new(TypedHandler::new(handler)));
    }

    /// Finishes registration.
    pub fn build(self) -> Result<HandlerRegistry, RegistryError> {
        if let Some(request) = self.duplicates.into_iter().next() {
            tracing::error!(request = %request, "duplicate handler registration");
            return Err(RegistryError::DuplicateHandler { request });
        }
        tracing::debug!(handlers = self.handlers.len(), "handler registry built");
        Ok(HandlerRegistry {
            handlers: self.handlers,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::{downcast_reply, FnHandler};
    use crate::request::Message;
    use crate::validation::{RuleSet, ValidationFailure};
    use crate::DispatchContext;

    struct Ping;

    impl Request for Ping {
        type Response = &'static str;
    }

    struct Count(i32);

    impl Request for Count {
        type Response = i32;
    }

    fn ping_handler() -> impl Handler<Ping> {
        FnHandler::new(|_ctx, _ping: Ping| async { Ok("pong") })
    }

    #[tokio::test]
    async fn test_resolve_registered_handler() {
        let registry = RegistryBuilder::new()
            .handler::<Ping, _>(ping_handler())
            .build()
            .unwrap();

        let ctx = DispatchContext::new();
        let handler = registry.resolve(&RequestDescriptor::of::<Ping>()).unwrap();
        let reply = handler.handle_message(&ctx, Message::new(Ping)).await.unwrap();
        assert_eq!(downcast_reply::<Ping>(reply).unwrap(), "pong");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_resolve_missing_handler() {
        let registry = RegistryBuilder::new().build().unwrap();
        let result = registry.resolve(&RequestDescriptor::of::<Count>());
        match result {
            Err(HermesError::HandlerNotFound { request }) => assert_eq!(request, "Count"),
            _ => panic!("expected HandlerNotFound"),
        }
    }

    #[test]
    fn test_duplicate_handler_rejected_at_build() {
        let result = RegistryBuilder::new()
            .handler::<Ping, _>(ping_handler())
            .handler::<Ping, _>(ping_handler())
            .build();
        assert_eq!(
            result.unwrap_err(),
            RegistryError::DuplicateHandler {
                request: "Ping".to_string()
            }
        );
    }

    #[test]
    fn test_request_names_sorted() {
        let registry = RegistryBuilder::new()
            .handler::<Ping, _>(ping_handler())
            .handler::<Count, _>(FnHandler::new(|_ctx, c: Count| async move { Ok(c.0) }))
            .build()
            .unwrap();
        assert_eq!(registry.request_names(), vec!["Count", "Ping"]);
    }

    #[tokio::test]
    async fn test_validator_registry_appends_in_order() {
        let mut validators = ValidatorRegistry::new();
        validators.add::<Count>(RuleSet::new().greater_than("Value", 0, |c: &Count| c.0));
        validators.add::<Count>(RuleSet::new().must("Value", "must be even", |c: &Count| c.0 % 2 == 0));

        assert_eq!(validators.count_for::<Count>(), 2);
        assert_eq!(validators.count_for::<Ping>(), 0);
        assert!(validators.get(TypeId::of::<Ping>()).is_none());

        let ctx = DispatchContext::new();
        let set = validators.get(TypeId::of::<Count>()).unwrap();
        let report = set
            .validate_message(&ctx, &Message::new(Count(-1)))
            .await
            .unwrap();
        let messages: Vec<_> = report.failures().iter().map(ValidationFailure::message).collect();
        assert_eq!(messages, vec!["'Value' must be greater than '0'.", "must be even"]);
    }
}
