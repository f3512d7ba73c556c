//! Remove a user.

use std::sync::Arc;

use hermes_core::{BoxFuture, DispatchContext, Handler, HermesError, HermesResult, Request, RuleSet};
use hermes_pipeline::DispatcherBuilder;
use serde::{Deserialize, Serialize};

use crate::dto::UserDto;
use crate::rules::UserExists;
use crate::store::{not_found_message, UserStore};

/// Deletes the user with `id` and returns it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteUserCommand {
    /// User id.
    pub id: i32,
}

impl Request for DeleteUserCommand {
    type Response = UserDto;
}

/// Handler for [`DeleteUserCommand`].
pub struct DeleteUserHandler {
    store: Arc<dyn UserStore>,
}

impl DeleteUserHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

impl Handler<DeleteUserCommand> for DeleteUserHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        command: DeleteUserCommand,
    ) -> BoxFuture<'a, HermesResult<UserDto>> {
        Box::pin(async move {
            match self.store.delete(command.id, ctx.cancellation()).await? {
                Some(user) => {
                    tracing::debug!(user_id = user.id, "user deleted");
                    Ok(UserDto::from(user))
                }
                None => Err(HermesError::not_found(not_found_message(command.id))),
            }
        })
    }
}

pub(crate) fn register(builder: DispatcherBuilder, store: &Arc<dyn UserStore>) -> DispatcherBuilder {
    builder
        .handler::<DeleteUserCommand, _>(DeleteUserHandler::new(Arc::clone(store)))
        .validator::<DeleteUserCommand>(UserExists::new(
            Arc::clone(store),
            |c: &DeleteUserCommand| c.id,
        ))
        .validator::<DeleteUserCommand>(
            RuleSet::new().greater_than("Id", 0, |c: &DeleteUserCommand| c.id),
        )
}
