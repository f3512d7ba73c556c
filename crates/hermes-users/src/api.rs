//! Transport facade for the user requests.
//!
//! Maps each operation to a status code and a JSON body the way an HTTP
//! controller would, without owning a socket. Successful operations return
//! the serialized response; failures return an [`ErrorEnvelope`] tagged with
//! the dispatch's request ID.
//!
//! | Outcome | Status |
//! |---------|--------|
//! | created | 201 |
//! | success | 200 |
//! | `Validation` | 400 |
//! | `NotFound` | 404 |
//! | `Cancelled` | 499 |
//! | anything else | 500 |
//!
//! [`ErrorEnvelope`]: hermes_core::ErrorEnvelope

use http::StatusCode;
use hermes_core::{DispatchContext, ErrorCategory, HermesError, HermesResult};
use hermes_pipeline::Dispatcher;
use serde::Serialize;
use serde_json::Value;

use crate::requests::{
    CreateUserCommand, DeleteUserCommand, FindUsersQuery, GetUserQuery, ListUsersQuery,
    UpdateUserCommand,
};

/// Status used when the caller went away (nginx's "client closed request").
pub const CLIENT_CLOSED_REQUEST: u16 = 499;

/// A transport-level response.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse {
    /// Status code.
    pub status: StatusCode,
    /// JSON body.
    pub body: Value,
    /// Where a created resource can be fetched.
    pub location: Option<String>,
}

impl ApiResponse {
    fn json(status: StatusCode, body: Value) -> Self {
        Self {
            status,
            body,
            location: None,
        }
    }

    /// Returns `true` for 2xx statuses.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Returns the status code for a dispatch failure.
pub fn status_for(error: &HermesError) -> StatusCode {
    match error.category() {
        ErrorCategory::Validation => StatusCode::BAD_REQUEST,
        ErrorCategory::NotFound => StatusCode::NOT_FOUND,
        ErrorCategory::Cancelled => {
            StatusCode::from_u16(CLIENT_CLOSED_REQUEST).unwrap_or(StatusCode::BAD_REQUEST)
        }
        ErrorCategory::Configuration | ErrorCategory::Domain | ErrorCategory::Internal => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Exposes the user requests as transport operations.
#[derive(Debug, Clone)]
pub struct UsersApi {
    dispatcher: Dispatcher,
}

impl UsersApi {
    /// Creates the facade over a dispatcher with the user requests registered.
    pub fn new(dispatcher: Dispatcher) -> Self {
        Self { dispatcher }
    }

    /// Returns the dispatcher.
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// `GET /Users?id=`
    pub async fn get_user(&self, ctx: &DispatchContext, query: GetUserQuery) -> ApiResponse {
        let result = self.dispatcher.dispatch(ctx, query).await;
        respond(ctx, result, StatusCode::OK)
    }

    /// `GET /Users/Find`
    pub async fn find_users(&self, ctx: &DispatchContext, query: FindUsersQuery) -> ApiResponse {
        let result = self.dispatcher.dispatch(ctx, query).await;
        respond(ctx, result, StatusCode::OK)
    }

    /// `GET /Users/List`
    pub async fn list_users(&self, ctx: &DispatchContext, query: ListUsersQuery) -> ApiResponse {
        let result = self.dispatcher.dispatch(ctx, query).await;
        respond(ctx, result, StatusCode::OK)
    }

    /// `POST /Users/Add`, answering 201 with the new user's location.
    pub async fn create_user(
        &self,
        ctx: &DispatchContext,
        command: CreateUserCommand,
    ) -> ApiResponse {
        match self.dispatcher.dispatch(ctx, command).await {
            Ok(user) => {
                let location = format!("/Users?id={}", user.user_id);
                let mut response = respond(ctx, Ok(user), StatusCode::CREATED);
                if response.status == StatusCode::CREATED {
                    response.location = Some(location);
                }
                response
            }
            Err(error) => failure(ctx, &error),
        }
    }

    /// `PUT /Users/Update`
    pub async fn update_user(
        &self,
        ctx: &DispatchContext,
        command: UpdateUserCommand,
    ) -> ApiResponse {
        let result = self.dispatcher.dispatch(ctx, command).await;
        respond(ctx, result, StatusCode::OK)
    }

    /// `DELETE /Users?id=`
    pub async fn delete_user(
        &self,
        ctx: &DispatchContext,
        command: DeleteUserCommand,
    ) -> ApiResponse {
        let result = self.dispatcher.dispatch(ctx, command).await;
        respond(ctx, result, StatusCode::OK)
    }
}

fn respond<T: Serialize>(
    ctx: &DispatchContext,
    result: HermesResult<T>,
    success: StatusCode,
) -> ApiResponse {
    let value = result.and_then(|value| {
        serde_json::to_value(value).map_err(|e| HermesError::internal(e.to_string()))
    });
    match value {
        Ok(body) => ApiResponse::json(success, body),
        Err(error) => failure(ctx, &error),
    }
}

fn failure(ctx: &DispatchContext, error: &HermesError) -> ApiResponse {
    let request_id = ctx.request_id().to_string();
    let envelope = error.to_envelope(Some(&request_id));
    let body = serde_json::to_value(envelope).unwrap_or(Value::Null);
    ApiResponse::json(status_for(error), body)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hermes_core::FieldFailure;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            status_for(&HermesError::validation(vec![FieldFailure::new("Id", "x")])),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(&HermesError::not_found("gone")),
            StatusCode::NOT_FOUND
        );
        assert_eq!(status_for(&HermesError::Cancelled).as_u16(), 499);
        assert_eq!(
            status_for(&HermesError::handler_not_found("GetUserQuery")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(
            status_for(&HermesError::domain("storage failure")),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_failure_body_carries_request_id() {
        let ctx = DispatchContext::new();
        let response = failure(&ctx, &HermesError::not_found("The user '42' could not be found."));
        assert_eq!(response.status, StatusCode::NOT_FOUND);
        assert_eq!(response.body["error"]["code"], "NOT_FOUND");
        assert_eq!(
            response.body["error"]["message"],
            "The user '42' could not be found."
        );
        assert_eq!(response.body["request_id"], ctx.request_id().to_string());
        assert!(!response.is_success());
    }
}
