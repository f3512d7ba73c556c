//! The user requests, one module per request type.
//!
//! Each module defines the request, its handler and the validators registered
//! for it. Existence checks run before field rules, so a missing user is
//! reported as not found even when other fields are invalid too.

mod create_user;
mod delete_user;
mod find_users;
mod get_user;
mod list_users;
mod update_user;

use std::sync::Arc;

use hermes_pipeline::DispatcherBuilder;

pub use create_user::{CreateUserCommand, CreateUserHandler};
pub use delete_user::{DeleteUserCommand, DeleteUserHandler};
pub use find_users::{FindUsersHandler, FindUsersQuery};
pub use get_user::{GetUserHandler, GetUserQuery};
pub use list_users::{has_next_page, ListUsersHandler, ListUsersQuery, DEFAULT_ITEMS_PER_PAGE};
pub use update_user::{UpdateUserCommand, UpdateUserHandler};

use crate::store::UserStore;

pub(crate) fn register_all(
    builder: DispatcherBuilder,
    store: &Arc<dyn UserStore>,
) -> DispatcherBuilder {
    let builder = get_user::register(builder, store);
    let builder = find_users::register(builder, store);
    let builder = list_users::register(builder, store);
    let builder = create_user::register(builder, store);
    let builder = update_user::register(builder, store);
    delete_user::register(builder, store)
}
