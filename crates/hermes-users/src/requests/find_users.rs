//! Search users by name.

use std::sync::Arc;

use hermes_core::{BoxFuture, DispatchContext, Handler, HermesResult, Request};
use hermes_pipeline::DispatcherBuilder;
use serde::{Deserialize, Serialize};

use crate::dto::UserDto;
use crate::store::UserStore;

/// Returns users whose given names OR last name match, ignoring case.
///
/// Absent or empty criteria match nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FindUsersQuery {
    /// Given names to match.
    #[serde(default)]
    pub given_names: Option<String>,
    /// Last name to match.
    #[serde(default)]
    pub last_name: Option<String>,
}

impl Request for FindUsersQuery {
    type Response = Vec<UserDto>;
}

/// Handler for [`FindUsersQuery`].
pub struct FindUsersHandler {
    store: Arc<dyn UserStore>,
}

impl FindUsersHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

impl Handler<FindUsersQuery> for FindUsersHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        query: FindUsersQuery,
    ) -> BoxFuture<'a, HermesResult<Vec<UserDto>>> {
        Box::pin(async move {
            let users = self
                .store
                .find(
                    query.given_names.as_deref(),
                    query.last_name.as_deref(),
                    ctx.cancellation(),
                )
                .await?;
            Ok(users.iter().map(UserDto::from).collect())
        })
    }
}

pub(crate) fn register(builder: DispatcherBuilder, store: &Arc<dyn UserStore>) -> DispatcherBuilder {
    builder.handler::<FindUsersQuery, _>(FindUsersHandler::new(Arc::clone(store)))
}
