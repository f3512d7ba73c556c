//! Replace a user's names and contact details.

use std::sync::Arc;

use hermes_core::{BoxFuture, DispatchContext, Handler, HermesError, HermesResult, Request, RuleSet};
use hermes_pipeline::DispatcherBuilder;
use serde::{Deserialize, Serialize};

use crate::dto::UserDto;
use crate::entity::ContactDetail;
use crate::rules::{
    is_valid_email_address, is_valid_mobile_number, UserExists, INVALID_EMAIL, INVALID_MOBILE,
};
use crate::store::{not_found_message, UserStore};

/// Overwrites every field of the user with `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserCommand {
    /// User id.
    #[serde(default)]
    pub id: i32,
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

impl Request for UpdateUserCommand {
    type Response = UserDto;
}

/// Handler for [`UpdateUserCommand`].
pub struct UpdateUserHandler {
    store: Arc<dyn UserStore>,
}

impl UpdateUserHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

impl Handler<UpdateUserCommand> for UpdateUserHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        command: UpdateUserCommand,
    ) -> BoxFuture<'a, HermesResult<UserDto>> {
        Box::pin(async move {
            let cancel = ctx.cancellation();
            let Some(mut user) = self.store.get(command.id, cancel).await? else {
                return Err(HermesError::not_found(not_found_message(command.id)));
            };

            user.given_names = command.given_names;
            user.last_name = command.last_name;
            let contact = user.contact_detail.get_or_insert_with(ContactDetail::default);
            contact.email_address = command.email_address;
            contact.mobile_number = command.mobile_number;

            // A concurrent delete between the read and the write surfaces as not found.
            let updated = self.store.update(user, cancel).await?;
            Ok(UserDto::from(updated))
        })
    }
}

fn rules() -> RuleSet<UpdateUserCommand> {
    RuleSet::new()
        .greater_than("Id", 0, |c: &UpdateUserCommand| c.id)
        .not_empty("GivenNames", |c: &UpdateUserCommand| c.given_names.as_str())
        .not_empty("LastName", |c: &UpdateUserCommand| c.last_name.as_str())
        .not_empty("EmailAddress", |c: &UpdateUserCommand| c.email_address.as_str())
        .must("EmailAddress", INVALID_EMAIL, |c: &UpdateUserCommand| {
            is_valid_email_address(&c.email_address)
        })
        .not_empty("MobileNumber", |c: &UpdateUserCommand| c.mobile_number.as_str())
        .must("MobileNumber", INVALID_MOBILE, |c: &UpdateUserCommand| {
            is_valid_mobile_number(&c.mobile_number)
        })
}

pub(crate) fn register(builder: DispatcherBuilder, store: &Arc<dyn UserStore>) -> DispatcherBuilder {
    builder
        .handler::<UpdateUserCommand, _>(UpdateUserHandler::new(Arc::clone(store)))
        .validator::<UpdateUserCommand>(UserExists::new(
            Arc::clone(store),
            |c: &UpdateUserCommand| c.id,
        ))
        .validator::<UpdateUserCommand>(rules())
}
