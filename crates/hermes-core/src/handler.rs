//! Handler trait for request processing.
//!
//! A [`Handler`] owns the business logic for exactly one request type. The
//! pipeline never sees typed handlers directly; they are wrapped in a
//! [`TypedHandler`] and stored behind the [`ErasedHandler`] trait.

use std::future::Future;
use std::marker::PhantomData;

use crate::request::{BoxFuture, Message, Reply, Request, RequestDescriptor};
use crate::{DispatchContext, HermesError, HermesResult};

/// A trait for handling typed requests.
///
/// Handlers receive the [`DispatchContext`] of the current dispatch along with
/// the request value, which they consume.
///
/// # Example
///
/// ```
/// use hermes_core::{BoxFuture, DispatchContext, Handler, HermesResult, Request};
///
/// struct Greet(String);
///
/// impl Request for Greet {
///     type Response = String;
/// }
///
/// struct GreetHandler;
///
/// impl Handler<Greet> for GreetHandler {
///     fn handle<'a>(
///         &'a self,
///         _ctx: &'a DispatchContext,
///         request: Greet,
///     ) -> BoxFuture<'a, HermesResult<String>> {
///         Box::pin(async move { Ok(format!("Hello, {}!", request.0)) })
///     }
/// }
/// ```
pub trait Handler<R: Request>: Send + Sync + 'static {
    /// Handles a request and returns its response.
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        request: R,
    ) -> BoxFuture<'a, HermesResult<R::Response>>;
}

/// A function-based handler wrapper.
///
/// The closure receives an owned clone of the context so the returned future
/// does not borrow from the caller.
///
/// ```
/// use hermes_core::{FnHandler, Request};
///
/// struct Ping;
///
/// impl Request for Ping {
///     type Response = &'static str;
/// }
///
/// let handler = FnHandler::new(|_ctx, _request: Ping| async { Ok("pong") });
/// # let _ = handler;
/// ```
pub struct FnHandler<F, R> {
    func: F,
    _marker: PhantomData<fn(R)>,
}

impl<F, R: Request> FnHandler<F, R> {
    /// Creates a new function-based handler.
    #[must_use]
    pub fn new<Fut>(func: F) -> Self
    where
        F: Fn(DispatchContext, R) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HermesResult<R::Response>> + Send + 'static,
    {
        Self {
            func,
            _marker: PhantomData,
        }
    }
}

impl<F, R, Fut> Handler<R> for FnHandler<F, R>
where
    R: Request,
    F: Fn(DispatchContext, R) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HermesResult<R::Response>> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        request: R,
    ) -> BoxFuture<'a, HermesResult<R::Response>> {
        Box::pin((self.func)(ctx.clone(), request))
    }
}

/// A type-erased handler, as stored in the registry.
pub trait ErasedHandler: Send + Sync + 'static {
    /// Describes the request type this handler accepts.
    fn descriptor(&self) -> RequestDescriptor;

    /// Handles an erased message, producing an erased reply.
    fn handle_message<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        message: Message,
    ) -> BoxFuture<'a, HermesResult<Reply>>;
}

/// Adapts a typed [`Handler`] to [`ErasedHandler`].
pub struct TypedHandler<R, H> {
    handler: H,
    _marker: PhantomData<fn(R)>,
}

impl<R, H> TypedHandler<R, H>
where
    R: Request,
    H: Handler<R>,
{
    /// Wraps a typed handler.
    #[must_use]
    pub const fn new(handler: H) -> Self {
        Self {
            handler,
            _marker: PhantomData,
        }
    }
}

impl<R, H> ErasedHandler for TypedHandler<R, H>
where
    R: Request,
    H: Handler<R>,
{
    fn descriptor(&self) -> RequestDescriptor {
        RequestDescriptor::of::<R>()
    }

    fn handle_message<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        message: Message,
    ) -> BoxFuture<'a, HermesResult<Reply>> {
        Box::pin(async move {
            let request = message.into_request::<R>().map_err(|message| {
                HermesError::internal(format!(
                    "handler for {} received {}",
                    RequestDescriptor::of::<R>().request_name(),
                    message.descriptor().request_name()
                ))
            })?;
            let response = self.handler.handle(ctx, request).await?;
            Ok(Box::new(response) as Reply)
        })
    }
}

/// Recovers the typed response of `R` from an erased reply.
pub fn downcast_reply<R: Request>(reply: Reply) -> HermesResult<R::Response> {
    reply
        .downcast::<R::Response>()
        .map(|response| *response)
        .map_err(|_| {
            HermesError::internal(format!(
                "reply is not a {}",
                RequestDescriptor::of::<R>().response_name()
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Greet {
        name: String,
    }

    impl Request for Greet {
        type Response = String;
    }

    struct Other;

    impl Request for Other {
        type Response = u8;
    }

    struct GreetHandler;

    impl Handler<Greet> for GreetHandler {
        fn handle<'a>(
            &'a self,
            _ctx: &'a DispatchContext,
            request: Greet,
        ) -> BoxFuture<'a, HermesResult<String>> {
            Box::pin(async move { Ok(format!("Hello, {}!", request.name)) })
        }
    }

    #[tokio::test]
    async fn test_handler_impl() {
        let ctx = DispatchContext::new();
        let response = GreetHandler
            .handle(
                &ctx,
                Greet {
                    name: "World".to_string(),
                },
            )
            .await
            .unwrap();
        assert_eq!(response, "Hello, World!");
    }

    #[tokio::test]
    async fn test_fn_handler_sees_context() {
        let ctx = DispatchContext::new();
        let expected = ctx.request_id();
        let handler = FnHandler::new(move |ctx: DispatchContext, _request: Other| async move {
            assert_eq!(ctx.request_id(), expected);
            Ok(3)
        });
        assert_eq!(handler.handle(&ctx, Other).await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_typed_handler_round_trip() {
        let ctx = DispatchContext::new();
        let erased: Box<dyn ErasedHandler> = Box::new(TypedHandler::new(GreetHandler));
        assert_eq!(erased.descriptor().request_name(), "Greet");

        let reply = erased
            .handle_message(
                &ctx,
                Message::new(Greet {
                    name: "Ada".to_string(),
                }),
            )
            .await
            .unwrap();
        assert_eq!(downcast_reply::<Greet>(reply).unwrap(), "Hello, Ada!");
    }

    #[tokio::test]
    async fn test_typed_handler_rejects_foreign_message() {
        let ctx = DispatchContext::new();
        let erased = TypedHandler::new(GreetHandler);
        let result = erased.handle_message(&ctx, Message::new(Other)).await;
        assert!(matches!(result, Err(HermesError::Internal { .. })));
    }

    #[test]
    fn test_downcast_reply_mismatch() {
        let reply: Reply = Box::new(7_u32);
        assert!(matches!(
            downcast_reply::<Greet>(reply),
            Err(HermesError::Internal { .. })
        ));
    }
}
