//! Request/response type model.
//!
//! A [`Request`] is a strongly-typed value bound to exactly one response type.
//! Inside the pipeline requests travel type-erased as a [`Message`], keyed by
//! their [`TypeId`], so that behaviors can be stored in a single ordered list.

use std::any::{Any, TypeId};
use std::future::Future;
use std::pin::Pin;

/// A boxed, sendable future.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A type-erased response travelling back up the pipeline.
pub type Reply = Box<dyn Any + Send>;

/// A strongly-typed request with a statically bound response type.
///
/// # Example
///
/// ```
/// use hermes_core::Request;
///
/// struct GetUserQuery {
///     id: i32,
/// }
///
/// struct UserDto {
///     user_id: i32,
/// }
///
/// impl Request for GetUserQuery {
///     type Response = UserDto;
/// }
/// ```
pub trait Request: Send + Sync + 'static {
    /// The response produced by this request's handler.
    type Response: Send + 'static;
}

/// Static description of a request type: its identity and display names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestDescriptor {
    type_id: TypeId,
    request_type: &'static str,
    response_type: &'static str,
}

impl RequestDescriptor {
    /// Describes the request type `R`.
    #[must_use]
    pub fn of<R: Request>() -> Self {
        Self {
            type_id: TypeId::of::<R>(),
            request_type: std::any::type_name::<R>(),
            response_type: std::any::type_name::<R::Response>(),
        }
    }

    /// Returns the `TypeId` every registry lookup is keyed on.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.type_id
    }

    /// Returns the request type name without module paths.
    #[must_use]
    pub fn request_name(&self) -> String {
        short_type_name(self.request_type)
    }

    /// Returns the response type name without module paths.
    #[must_use]
    pub fn response_name(&self) -> String {
        short_type_name(self.response_type)
    }
}

/// A request in flight through the pipeline, with its type erased.
pub struct Message {
    descriptor: RequestDescriptor,
    payload: Box<dyn Any + Send + Sync>,
}

impl Message {
    /// Wraps a typed request.
    #[must_use]
    pub fn new<R: Request>(request: R) -> Self {
        Self {
            descriptor: RequestDescriptor::of::<R>(),
            payload: Box::new(request),
        }
    }

    /// Returns the descriptor of the wrapped request.
    #[must_use]
    pub const fn descriptor(&self) -> &RequestDescriptor {
        &self.descriptor
    }

    /// Returns the `TypeId` of the wrapped request.
    #[must_use]
    pub const fn type_id(&self) -> TypeId {
        self.descriptor.type_id
    }

    /// Borrows the erased payload.
    #[must_use]
    pub fn payload(&self) -> &(dyn Any + Send + Sync) {
        self.payload.as_ref()
    }

    /// Borrows the payload as `R`, if it is one.
    #[must_use]
    pub fn downcast_ref<R: Request>(&self) -> Option<&R> {
        self.payload.downcast_ref::<R>()
    }

    /// Recovers the typed request, handing the message back on mismatch.
    pub fn into_request<R: Request>(self) -> Result<R, Self> {
        let Self {
            descriptor,
            payload,
        } = self;
        match payload.downcast::<R>() {
            Ok(request) => Ok(*request),
            Err(payload) => Err(Self {
                descriptor,
                payload,
            }),
        }
    }
}

impl std::fmt::Debug for Message {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Message")
            .field("request", &self.descriptor.request_name())
            .finish_non_exhaustive()
    }
}

/// Strips module paths from a fully qualified type name, including inside
/// generic arguments.
///
/// ```
/// use hermes_core::request::short_type_name;
///
/// assert_eq!(
///     short_type_name("app::dto::Page<alloc::vec::Vec<app::dto::UserDto>>"),
///     "Page<Vec<UserDto>>"
/// );
/// ```
#[must_use]
pub fn short_type_name(full: &str) -> String {
    let mut short = String::with_capacity(full.len());
    let mut token = String::new();

    for c in full.chars() {
        if c.is_alphanumeric() || c == '_' || c == ':' {
            token.push(c);
        } else {
            short.push_str(last_segment(&token));
            token.clear();
            short.push(c);
        }
    }
    short.push_str(last_segment(&token));
    short
}

fn last_segment(path: &str) -> &str {
    path.rsplit("::").next().unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Ping(u32);

    struct Pong;

    impl Request for Ping {
        type Response = Pong;
    }

    #[derive(Debug)]
    struct Other;

    impl Request for Other {
        type Response = ();
    }

    #[test]
    fn test_descriptor_names() {
        let descriptor = RequestDescriptor::of::<Ping>();
        assert_eq!(descriptor.request_name(), "Ping");
        assert_eq!(descriptor.response_name(), "Pong");
        assert_eq!(descriptor.type_id(), TypeId::of::<Ping>());
    }

    #[test]
    fn test_message_round_trip() {
        let message = Message::new(Ping(7));
        assert_eq!(message.type_id(), TypeId::of::<Ping>());
        assert_eq!(message.downcast_ref::<Ping>(), Some(&Ping(7)));
        assert_eq!(message.into_request::<Ping>().ok(), Some(Ping(7)));
    }

    #[test]
    fn test_message_mismatch_returns_message() {
        let message = Message::new(Ping(1));
        let message = message.into_request::<Other>().unwrap_err();
        assert_eq!(message.descriptor().request_name(), "Ping");
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name("Plain"), "Plain");
        assert_eq!(short_type_name("a::b::C"), "C");
        assert_eq!(short_type_name("()"), "()");
        assert_eq!(
            short_type_name("core::option::Option<a::User>"),
            "Option<User>"
        );
        assert_eq!(
            short_type_name("std::collections::HashMap<alloc::string::String, i32>"),
            "HashMap<String, i32>"
        );
    }
}
