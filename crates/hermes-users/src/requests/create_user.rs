//! Create a user.

use std::sync::Arc;

use hermes_core::{BoxFuture, DispatchContext, Handler, HermesResult, Request, RuleSet};
use hermes_pipeline::DispatcherBuilder;
use serde::{Deserialize, Serialize};

use crate::dto::UserDto;
use crate::entity::User;
use crate::rules::{is_valid_email_address, is_valid_mobile_number, INVALID_EMAIL, INVALID_MOBILE};
use crate::store::UserStore;

/// Stores a new user with contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateUserCommand {
    /// Given names.
    #[serde(default)]
    pub given_names: String,
    /// Last name.
    #[serde(default)]
    pub last_name: String,
    /// Email address.
    #[serde(default)]
    pub email_address: String,
    /// Mobile number.
    #[serde(default)]
    pub mobile_number: String,
}

impl Request for CreateUserCommand {
    type Response = UserDto;
}

/// Handler for [`CreateUserCommand`].
pub struct CreateUserHandler {
    store: Arc<dyn UserStore>,
}

impl CreateUserHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

impl Handler<CreateUserCommand> for CreateUserHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        command: CreateUserCommand,
    ) -> BoxFuture<'a, HermesResult<UserDto>> {
        Box::pin(async move {
            let user = User::new(command.given_names, command.last_name)
                .with_contact(command.email_address, command.mobile_number);
            let created = self.store.add(user, ctx.cancellation()).await?;

            tracing::debug!(user_id = created.id, "user created");
            Ok(UserDto::from(created))
        })
    }
}

fn rules() -> RuleSet<CreateUserCommand> {
    RuleSet::new()
        .not_empty("GivenNames", |c: &CreateUserCommand| c.given_names.as_str())
        .not_empty("LastName", |c: &CreateUserCommand| c.last_name.as_str())
        .not_empty("EmailAddress", |c: &CreateUserCommand| c.email_address.as_str())
        .must("EmailAddress", INVALID_EMAIL, |c: &CreateUserCommand| {
            is_valid_email_address(&c.email_address)
        })
        .not_empty("MobileNumber", |c: &CreateUserCommand| c.mobile_number.as_str())
        .must("MobileNumber", INVALID_MOBILE, |c: &CreateUserCommand| {
            is_valid_mobile_number(&c.mobile_number)
        })
}

pub(crate) fn register(builder: DispatcherBuilder, store: &Arc<dyn UserStore>) -> DispatcherBuilder {
    builder
        .handler::<CreateUserCommand, _>(CreateUserHandler::new(Arc::clone(store)))
        .validator::<CreateUserCommand>(rules())
}
