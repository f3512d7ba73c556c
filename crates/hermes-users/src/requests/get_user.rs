//! Fetch one user by id.

use std::sync::Arc;

use hermes_core::{BoxFuture, DispatchContext, Handler, HermesError, HermesResult, Request, RuleSet};
use hermes_pipeline::DispatcherBuilder;
use serde::{Deserialize, Serialize};

use crate::dto::UserDto;
use crate::rules::UserExists;
use crate::store::{not_found_message, UserStore};

/// Returns the user with `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetUserQuery {
    /// User id.
    pub id: i32,
}

impl Request for GetUserQuery {
    type Response = UserDto;
}

/// Handler for [`GetUserQuery`].
pub struct GetUserHandler {
    store: Arc<dyn UserStore>,
}

impl GetUserHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

impl Handler<GetUserQuery> for GetUserHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        query: GetUserQuery,
    ) -> BoxFuture<'a, HermesResult<UserDto>> {
        Box::pin(async move {
            match self.store.get(query.id, ctx.cancellation()).await? {
                Some(user) => Ok(UserDto::from(user)),
                None => Err(HermesError::not_found(not_found_message(query.id))),
            }
        })
    }
}

pub(crate) fn register(builder: DispatcherBuilder, store: &Arc<dyn UserStore>) -> DispatcherBuilder {
    builder
        .handler::<GetUserQuery, _>(GetUserHandler::new(Arc::clone(store)))
        .validator::<GetUserQuery>(UserExists::new(Arc::clone(store), |q: &GetUserQuery| q.id))
        .validator::<GetUserQuery>(RuleSet::new().greater_than("Id", 0, |q: &GetUserQuery| q.id))
}
