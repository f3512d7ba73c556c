//! Request dispatcher.
//!
//! The [`Dispatcher`] is the single entry point of the pipeline. It resolves
//! the handler for the request's type, runs the request through the
//! [`Pipeline`] and hands the typed response back. It never catches or
//! reinterprets failures.
//!
//! # Example
//!
//! ```
//! use hermes_core::{FnHandler, Request, RuleSet};
//! use hermes_pipeline::Dispatcher;
//!
//! struct Square(i64);
//!
//! impl Request for Square {
//!     type Response = i64;
//! }
//!
//! # tokio_test::block_on(async {
//! let dispatcher = Dispatcher::builder()
//!     .handler::<Square, _>(FnHandler::new(|_ctx, s: Square| async move { Ok(s.0 * s.0) }))
//!     .validator::<Square>(RuleSet::new().greater_than("Value", 0, |s: &Square| s.0))
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(dispatcher.send(Square(12)).await.unwrap(), 144);
//! assert!(dispatcher.send(Square(-3)).await.is_err());
//! # });
//! ```

use std::sync::Arc;

use hermes_core::handler::downcast_reply;
use hermes_core::{
    DispatchContext, Handler, HandlerRegistry, HermesResult, Message, RegistryBuilder,
    RegistryError, Request, RequestDescriptor, Validator, ValidatorRegistry,
};

use crate::pipeline::Pipeline;
use crate::stages::{DispatchSink, LoggingBehavior, TracingSink, ValidationBehavior};

/// Routes typed requests to their handlers through the behavior pipeline.
///
/// Cheap to clone; clones share the same immutable registry and pipeline.
#[derive(Clone)]
pub struct Dispatcher {
    inner: Arc<DispatcherInner>,
}

struct DispatcherInner {
    handlers: HandlerRegistry,
    pipeline: Pipeline,
}

impl Dispatcher {
    /// Creates a new dispatcher builder.
    #[must_use]
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::new()
    }

    /// Dispatches a request within the given context.
    ///
    /// Fails with [`HermesError::HandlerNotFound`](hermes_core::HermesError::HandlerNotFound)
    /// before any behavior runs if no handler is registered for `R`.
    pub async fn dispatch<R: Request>(
        &self,
        ctx: &DispatchContext,
        request: R,
    ) -> HermesResult<R::Response> {
        let descriptor = RequestDescriptor::of::<R>();
        let handler = match self.inner.handlers.resolve(&descriptor) {
            Ok(handler) => handler,
            Err(error) => {
                tracing::error!(
                    request = %descriptor.request_name(),
                    request_id = %ctx.request_id(),
                    %error,
                    "no handler registered"
                );
                return Err(error);
            }
        };

        let reply = self
            .inner
            .pipeline
            .run(ctx, handler, Message::new(request))
            .await?;
        downcast_reply::<R>(reply)
    }

    /// Dispatches a request with a fresh context.
    pub async fn send<R: Request>(&self, request: R) -> HermesResult<R::Response> {
        self.dispatch(&DispatchContext::new(), request).await
    }

    /// Returns `true` if a handler is registered for `R`.
    #[must_use]
    pub fn handles<R: Request>(&self) -> bool {
        self.inner.handlers.contains::<R>()
    }

    /// Returns the handler registry.
    #[must_use]
    pub fn handlers(&self) -> &HandlerRegistry {
        &self.inner.handlers
    }

    /// Returns the pipeline.
    #[must_use]
    pub fn pipeline(&self) -> &Pipeline {
        &self.inner.pipeline
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.inner.handlers)
            .field("pipeline", &self.inner.pipeline)
            .finish()
    }
}

/// Builder for a [`Dispatcher`].
///
/// Every dispatcher gets the full fixed pipeline. Without an explicit
/// [`sink`](Self::sink) the logging stage writes to a [`TracingSink`].
#[derive(Default)]
pub struct DispatcherBuilder {
    handlers: RegistryBuilder,
    validators: ValidatorRegistry,
    sink: Option<Arc<dyn DispatchSink>>,
}

impl DispatcherBuilder {
    /// Creates an empty builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the handler for request type `R`.
    ///
    /// Registering a second handler for the same type makes
    /// [`build`](Self::build) fail.
    #[must_use]
    pub fn handler<R, H>(mut self, handler: H) -> Self
    where
        R: Request,
        H: Handler<R>,
    {
        self.handlers.register::<R, H>(handler);
        self
    }

    /// Appends a validator for request type `R`.
    ///
    /// Validators of one type run in the order they were added.
    #[must_use]
    pub fn validator<R: Request>(mut self, validator: impl Validator<R>) -> Self {
        self.validators.add::<R>(validator);
        self
    }

    /// Sets the sink of the logging stage.
    #[must_use]
    pub fn sink(mut self, sink: impl DispatchSink) -> Self {
        self.sink = Some(Arc::new(sink));
        self
    }

    /// Builds the dispatcher.
    pub fn build(self) -> Result<Dispatcher, RegistryError> {
        let handlers = self.handlers.build()?;
        let sink = self
            .sink
            .unwrap_or_else(|| Arc::new(TracingSink::new()));

        let pipeline = Pipeline::builder()
            .logging(LoggingBehavior::new(Arc::clone(&sink)))
            .validation(ValidationBehavior::new(Arc::new(self.validators)).with_sink(sink))
            .build();

        Ok(Dispatcher {
            inner: Arc::new(DispatcherInner { handlers, pipeline }),
        })
    }
}
