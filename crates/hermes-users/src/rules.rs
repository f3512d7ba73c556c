//! Format rules and the user existence check.

use std::marker::PhantomData;
use std::sync::{Arc, OnceLock};

use hermes_core::{
    BoxFuture, DispatchContext, HermesError, HermesResult, Request, ValidationFailure, Validator,
};
use regex::Regex;

use crate::store::{not_found_message, UserStore};

const EMAIL_PATTERN: &str = r"^\w+([-+.']\w+)*@\w+([-.]\w+)*\.\w+([-.]\w+)*$";

/// Message of a failed email format check.
pub const INVALID_EMAIL: &str = "Email address is not valid.";

/// Message of a failed mobile number format check.
pub const INVALID_MOBILE: &str = "Mobile Number is not valid.";

fn email_regex() -> &'static Regex {
    static EMAIL: OnceLock<Regex> = OnceLock::new();
    EMAIL.get_or_init(|| Regex::new(EMAIL_PATTERN).expect("valid email pattern"))
}

/// Returns `true` if `s` looks like an email address.
pub fn is_valid_email_address(s: &str) -> bool {
    email_regex().is_match(s)
}

/// Returns `true` if `s` starts with `0` and is an integer.
///
/// Trailing whitespace after the digits is accepted.
pub fn is_valid_mobile_number(s: &str) -> bool {
    let digits = s.trim_end_matches(|c: char| matches!(c, ' ' | '\t'..='\r'));
    s.starts_with('0') && digits.parse::<i64>().is_ok()
}

/// Reports a not-found failure when the user a request refers to is missing.
///
/// Ids of zero or below are left to the `Id` field rule.
pub struct UserExists<R> {
    store: Arc<dyn UserStore>,
    id: fn(&R) -> i32,
    _request: PhantomData<fn(R)>,
}

impl<R: Request> UserExists<R> {
    /// Checks the id extracted by `id` against `store`.
    pub fn new(store: Arc<dyn UserStore>, id: fn(&R) -> i32) -> Self {
        Self {
            store,
            id,
            _request: PhantomData,
        }
    }
}

impl<R: Request> Validator<R> for UserExists<R> {
    fn validate<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        request: &'a R,
    ) -> BoxFuture<'a, HermesResult<Vec<ValidationFailure>>> {
        Box::pin(async move {
            let id = (self.id)(request);
            if id <= 0 {
                return Ok(Vec::new());
            }

            let user = self
                .store
                .get(id, ctx.cancellation())
                .await
                .map_err(HermesError::from)?;

            Ok(match user {
                Some(_) => Vec::new(),
                None => vec![ValidationFailure::not_found(not_found_message(id))],
            })
        })
    }
}
