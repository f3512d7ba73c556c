//! User management on the Hermes dispatch pipeline.
//!
//! Six requests ([`GetUserQuery`], [`FindUsersQuery`], [`ListUsersQuery`],
//! [`CreateUserCommand`], [`UpdateUserCommand`], [`DeleteUserCommand`]) with
//! their handlers and validators, a [`UserStore`] collaborator with an
//! in-memory implementation, and the [`UsersApi`] transport facade.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use hermes_pipeline::Dispatcher;
//! use hermes_users::{register, GetUserQuery, InMemoryUserStore};
//!
//! # tokio_test::block_on(async {
//! let dispatcher = register(Dispatcher::builder(), Arc::new(InMemoryUserStore::seeded()))
//!     .build()
//!     .unwrap();
//!
//! let user = dispatcher.send(GetUserQuery { id: 7 }).await.unwrap();
//! assert_eq!(user.last_name, "Hamilton");
//!
//! let missing = dispatcher.send(GetUserQuery { id: 42 }).await.unwrap_err();
//! assert_eq!(missing.to_string(), "Not found: The user '42' could not be found.");
//! # });
//! ```

pub mod api;
pub mod dto;
pub mod entity;
pub mod requests;
pub mod rules;
pub mod store;

use std::sync::Arc;

use hermes_pipeline::DispatcherBuilder;

pub use api::{status_for, ApiResponse, UsersApi};
pub use dto::{PaginatedDto, UserDto};
pub use entity::{ContactDetail, User};
pub use requests::{
    CreateUserCommand, DeleteUserCommand, FindUsersQuery, GetUserQuery, ListUsersQuery,
    UpdateUserCommand,
};
pub use store::{not_found_message, InMemoryUserStore, StoreError, UserStore};

/// Registers every user request's handler and validators on `builder`.
pub fn register(builder: DispatcherBuilder, store: Arc<dyn UserStore>) -> DispatcherBuilder {
    requests::register_all(builder, &store)
}
