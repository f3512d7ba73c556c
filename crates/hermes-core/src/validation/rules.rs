//! Declarative synchronous field rules.

use std::fmt::Display;

use super::{ValidationFailure, Validator};
use crate::request::{BoxFuture, Request};
use crate::{DispatchContext, HermesResult};

type Check<R> = Box<dyn Fn(&R) -> Option<String> + Send + Sync>;

struct FieldRule<R> {
    field: String,
    check: Check<R>,
}

/// A list of synchronous field rules for request type `R`.
///
/// Every rule is evaluated, in declaration order, even after earlier rules
/// failed. Failure messages quote the field's display name, so `GivenNames`
/// renders as `'Given Names'`.
///
/// # Example
///
/// ```
/// use hermes_core::{Request, RuleSet, ValidationFailure};
///
/// struct ListUsersQuery {
///     page_number: i32,
/// }
///
/// impl Request for ListUsersQuery {
///     type Response = ();
/// }
///
/// let rules = RuleSet::<ListUsersQuery>::new()
///     .greater_than("PageNumber", 0, |q| q.page_number);
///
/// let failures = rules.check(&ListUsersQuery { page_number: 0 });
/// assert_eq!(
///     failures,
///     vec![ValidationFailure::invalid("PageNumber", "'Page Number' must be greater than '0'.")]
/// );
/// ```
pub struct RuleSet<R> {
    rules: Vec<FieldRule<R>>,
}

impl<R: Request> RuleSet<R> {
    /// Creates an empty rule set.
    #[must_use]
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// Adds a rule that returns a failure message, or `None` when satisfied.
    pub fn rule<F>(mut self, field: impl Into<String>, check: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        self.rules.push(FieldRule {
            field: field.into(),
            check: Box::new(check),
        });
        self
    }

    /// Requires a string field to contain something other than whitespace.
    pub fn not_empty<F>(self, field: &str, get: F) -> Self
    where
        F: Fn(&R) -> &str + Send + Sync + 'static,
    {
        let message = format!("'{}' must not be empty.", display_name(field));
        self.rule(field, move |request| {
            get(request).trim().is_empty().then(|| message.clone())
        })
    }

    /// Requires a field to be strictly greater than `threshold`.
    pub fn greater_than<T, F>(self, field: &str, threshold: T, get: F) -> Self
    where
        T: PartialOrd + Display + Send + Sync + 'static,
        F: Fn(&R) -> T + Send + Sync + 'static,
    {
        let message = format!(
            "'{}' must be greater than '{threshold}'.",
            display_name(field)
        );
        self.rule(field, move |request| {
            (get(request) <= threshold).then(|| message.clone())
        })
    }

    /// Requires `predicate` to hold, failing with `message` otherwise.
    pub fn must<F>(self, field: &str, message: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&R) -> bool + Send + Sync + 'static,
    {
        let message = message.into();
        self.rule(field, move |request| {
            (!predicate(request)).then(|| message.clone())
        })
    }

    /// Number of rules.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if no rule is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Evaluates every rule against `request`.
    #[must_use]
    pub fn check(&self, request: &R) -> Vec<ValidationFailure> {
        self.rules
            .iter()
            .filter_map(|rule| {
                (rule.check)(request)
                    .map(|message| ValidationFailure::invalid(rule.field.clone(), message))
            })
            .collect()
    }
}

impl<R: Request> Default for RuleSet<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: Request> Validator<R> for RuleSet<R> {
    fn validate<'a>(
        &'a self,
        _ctx: &'a DispatchContext,
        request: &'a R,
    ) -> BoxFuture<'a, HermesResult<Vec<ValidationFailure>>> {
        let failures = self.check(request);
        Box::pin(async move { Ok(failures) })
    }
}

/// Splits a PascalCase field name into words: `MobileNumber` -> `Mobile Number`.
fn display_name(field: &str) -> String {
    let mut name = String::with_capacity(field.len() + 4);
    let mut previous: Option<char> = None;
    for c in field.chars() {
        if c.is_uppercase() && previous.is_some_and(char::is_lowercase) {
            name.push(' ');
        }
        name.push(c);
        previous = Some(c);
    }
    name
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Person {
        id: i32,
        given_names: String,
        mobile_number: String,
    }

    impl Request for Person {
        type Response = ();
    }

    fn rules() -> RuleSet<Person> {
        RuleSet::new()
            .greater_than("Id", 0, |p: &Person| p.id)
            .not_empty("GivenNames", |p: &Person| p.given_names.as_str())
            .not_empty("MobileNumber", |p: &Person| p.mobile_number.as_str())
            .must("MobileNumber", "Mobile Number is not valid.", |p: &Person| {
                p.mobile_number.starts_with('0')
            })
    }

    #[test]
    fn test_valid_request_has_no_failures() {
        let person = Person {
            id: 7,
            given_names: "Ada".into(),
            mobile_number: "0412345678".into(),
        };
        assert!(rules().check(&person).is_empty());
    }

    #[test]
    fn test_all_rules_evaluated_in_order() {
        let person = Person {
            id: 0,
            given_names: "   ".into(),
            mobile_number: String::new(),
        };
        let failures = rules().check(&person);
        assert_eq!(
            failures,
            vec![
                ValidationFailure::invalid("Id", "'Id' must be greater than '0'."),
                ValidationFailure::invalid("GivenNames", "'Given Names' must not be empty."),
                ValidationFailure::invalid("MobileNumber", "'Mobile Number' must not be empty."),
                ValidationFailure::invalid("MobileNumber", "Mobile Number is not valid."),
            ]
        );
    }

    #[test]
    fn test_display_name() {
        assert_eq!(display_name("Id"), "Id");
        assert_eq!(display_name("EmailAddress"), "Email Address");
        assert_eq!(display_name("ItemsPerPage"), "Items Per Page");
    }

    #[tokio::test]
    async fn test_rule_set_is_a_validator() {
        let ctx = DispatchContext::new();
        let person = Person {
            id: -1,
            given_names: "Ada".into(),
            mobile_number: "0400000000".into(),
        };
        let failures = rules().validate(&ctx, &person).await.unwrap();
        assert_eq!(failures.len(), 1);
        assert_eq!(rules().len(), 4);
    }
}
