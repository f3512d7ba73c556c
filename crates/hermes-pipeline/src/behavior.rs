//! Core behavior trait and continuation.
//!
//! A [`Behavior`] wraps the handler invocation for every request type. It
//! receives the dispatch context, the erased request and a [`Next`]
//! continuation representing the rest of the pipeline.
//!
//! # Invariants
//!
//! - A behavior calls `next.run()` at most once (zero times to short-circuit)
//! - A behavior never swallows or reclassifies a failure from `next`
//! - A behavior cannot change the pipeline order

use hermes_core::{
    BoxFuture, DispatchContext, ErasedHandler, HermesError, HermesResult, Message, Reply,
};

/// A cross-cutting stage wrapped around every handler invocation.
///
/// # Example
///
/// ```
/// use hermes_core::{BoxFuture, DispatchContext, HermesResult, Message, Reply};
/// use hermes_pipeline::{Behavior, Next};
///
/// struct Audit;
///
/// impl Behavior for Audit {
///     fn name(&self) -> &'static str {
///         "audit"
///     }
///
///     fn invoke<'a>(
///         &'a self,
///         ctx: &'a DispatchContext,
///         message: Message,
///         next: Next<'a>,
///     ) -> BoxFuture<'a, HermesResult<Reply>> {
///         Box::pin(async move {
///             tracing::debug!(request_id = %ctx.request_id(), "audit");
///             next.run(ctx, message).await
///         })
///     }
/// }
/// ```
pub trait Behavior: Send + Sync + 'static {
    /// Returns the stage name used in logs and diagnostics.
    fn name(&self) -> &'static str;

    /// Processes the message, usually by awaiting `next`.
    fn invoke<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        message: Message,
        next: Next<'a>,
    ) -> BoxFuture<'a, HermesResult<Reply>>;
}

type Terminal<'a> = Box<dyn FnOnce(Message) -> BoxFuture<'a, HermesResult<Reply>> + Send + 'a>;

/// The rest of the pipeline, as seen from one behavior.
///
/// Consumed by [`run`](Self::run), so it can be invoked at most once.
pub struct Next<'a> {
    inner: NextInner<'a>,
}

enum NextInner<'a> {
    Chain {
        behavior: &'a dyn Behavior,
        next: Box<Next<'a>>,
    },
    Handler(&'a dyn ErasedHandler),
    Terminal(Terminal<'a>),
}

impl<'a> Next<'a> {
    /// Wraps `next` with `behavior`.
    pub(crate) fn new(behavior: &'a dyn Behavior, next: Next<'a>) -> Self {
        Self {
            inner: NextInner::Chain {
                behavior,
                next: Box::new(next),
            },
        }
    }

    /// Creates the terminal continuation that invokes a resolved handler.
    pub(crate) fn handler(handler: &'a dyn ErasedHandler) -> Self {
        Self {
            inner: NextInner::Handler(handler),
        }
    }

    /// Creates a terminal continuation from a closure.
    ///
    /// Lets a behavior be exercised in isolation against a stub.
    pub fn terminal<F>(f: F) -> Self
    where
        F: FnOnce(Message) -> BoxFuture<'a, HermesResult<Reply>> + Send + 'a,
    {
        Self {
            inner: NextInner::Terminal(Box::new(f)),
        }
    }

    /// Invokes the next behavior, or the handler at the end of the chain.
    ///
    /// Fails with [`HermesError::Cancelled`] without making progress if the
    /// dispatch was cancelled. The terminal call is raced against the
    /// cancellation signal.
    pub async fn run(self, ctx: &'a DispatchContext, message: Message) -> HermesResult<Reply> {
        ctx.ensure_active()?;

        let terminal = match self.inner {
            NextInner::Chain { behavior, next } => {
                return behavior.invoke(ctx, message, *next).await;
            }
            NextInner::Handler(handler) => handler.handle_message(ctx, message),
            NextInner::Terminal(f) => f(message),
        };

        tokio::select! {
            biased;
            () = ctx.cancellation().cancelled() => Err(HermesError::Cancelled),
            result = terminal => result,
        }
    }
}

impl std::fmt::Debug for Next<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.inner {
            NextInner::Chain { behavior, .. } => {
                f.debug_tuple("Next::Chain").field(&behavior.name()).finish()
            }
            NextInner::Handler(handler) => f
                .debug_tuple("Next::Handler")
                .field(&handler.descriptor().request_name())
                .finish(),
            NextInner::Terminal(_) => f.write_str("Next::Terminal"),
        }
    }
}
