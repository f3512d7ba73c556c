//! User storage collaborator.
//!
//! Handlers and existence validators only see the [`UserStore`] trait. Every
//! operation takes the dispatch's [`CancellationSignal`] and fails with
//! [`StoreError::Cancelled`] once it is triggered.

use std::collections::BTreeMap;

use hermes_core::{BoxFuture, CancellationSignal, HermesError};
use parking_lot::RwLock;
use thiserror::Error;

use crate::entity::User;

/// Renders the standard not-found message for a user id.
pub fn not_found_message(id: i32) -> String {
    format!("The user '{id}' could not be found.")
}

/// Storage failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The caller cancelled the operation.
    #[error("storage operation cancelled")]
    Cancelled,

    /// The user to modify does not exist.
    #[error("user {id} does not exist")]
    Missing {
        /// The requested id.
        id: i32,
    },

    /// The backing store failed.
    #[error("storage failure: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<StoreError> for HermesError {
    fn from(error: StoreError) -> Self {
        match error {
            StoreError::Cancelled => Self::Cancelled,
            StoreError::Missing { id } => Self::not_found(not_found_message(id)),
            StoreError::Backend(source) => Self::domain_with_source("storage failure", source),
        }
    }
}

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistent user storage.
pub trait UserStore: Send + Sync + 'static {
    /// Returns the user with `id`, if any.
    fn get<'a>(
        &'a self,
        id: i32,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Option<User>>>;

    /// Returns users whose given names OR last name equal the criteria,
    /// ignoring case. Empty or absent criteria match nothing.
    fn find<'a>(
        &'a self,
        given_names: Option<&'a str>,
        last_name: Option<&'a str>,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Vec<User>>>;

    /// Returns page `page` (1-based) of `page_size` users, in id order.
    fn list_page<'a>(
        &'a self,
        page: i32,
        page_size: i32,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Vec<User>>>;

    /// Returns the number of stored users.
    fn count<'a>(&'a self, cancel: &'a CancellationSignal) -> BoxFuture<'a, StoreResult<usize>>;

    /// Stores a new user and returns it with its assigned id.
    fn add<'a>(&'a self, user: User, cancel: &'a CancellationSignal)
        -> BoxFuture<'a, StoreResult<User>>;

    /// Replaces an existing user. Fails with [`StoreError::Missing`] if the
    /// id is not stored.
    fn update<'a>(
        &'a self,
        user: User,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<User>>;

    /// Removes and returns the user with `id`, if any.
    fn delete<'a>(
        &'a self,
        id: i32,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Option<User>>>;
}

#[derive(Debug, Default)]
struct Users {
    by_id: BTreeMap<i32, User>,
    last_id: i32,
}

/// In-memory [`UserStore`].
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
    users: RwLock<Users>,
}

impl InMemoryUserStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store holding `users`. Ids of zero are assigned in order.
    ///
    /// Fails if no id is left to assign.
    pub fn with_users(users: impl IntoIterator<Item = User>) -> StoreResult<Self> {
        let store = Self::new();
        {
            let mut guard = store.users.write();
            for user in users {
                guard.insert(user)?;
            }
        }
        Ok(store)
    }

    /// Creates a store with ten sample users, ids 1 to 10.
    #[must_use]
    pub fn seeded() -> Self {
        const SAMPLE: [(&str, &str, &str, &str); 10] = [
            ("Ada", "Lovelace", "ada.lovelace@example.com", "0400000001"),
            ("Alan", "Turing", "alan.turing@example.com", "0400000002"),
            ("Grace", "Hopper", "grace.hopper@example.com", "0400000003"),
            ("Edsger", "Dijkstra", "edsger.dijkstra@example.com", "0400000004"),
            ("Barbara", "Liskov", "barbara.liskov@example.com", "0400000005"),
            ("Donald", "Knuth", "donald.knuth@example.com", "0400000006"),
            ("Margaret", "Hamilton", "margaret.hamilton@example.com", "0400000007"),
            ("John", "Backus", "john.backus@example.com", "0400000008"),
            ("Frances", "Allen", "frances.allen@example.com", "0400000009"),
            ("Ken", "Thompson", "ken.thompson@example.com", "0400000010"),
        ];

        let mut users = Users::default();
        for (id, (given, last, email, mobile)) in (1..).zip(SAMPLE) {
            let mut user = User::new(given, last).with_contact(email, mobile);
            user.id = id;
            users.by_id.insert(id, user);
            users.last_id = id;
        }
        Self {
            users: RwLock::new(users),
        }
    }

    /// Number of stored users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.read().by_id.len()
    }

    /// Returns `true` if no user is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.read().by_id.is_empty()
    }
}

impl Users {
    fn insert(&mut self, mut user: User) -> StoreResult<User> {
        if user.id == 0 {
            let id = self
                .last_id
                .checked_add(1)
                .ok_or_else(|| StoreError::Backend(anyhow::anyhow!("user ids exhausted")))?;
            self.last_id = id;
            user.id = id;
        } else {
            self.last_id = self.last_id.max(user.id);
        }
        self.by_id.insert(user.id, user.clone());
        Ok(user)
    }
}

fn name_matches(candidate: &str, criterion: Option<&str>) -> bool {
    criterion
        .filter(|c| !c.is_empty())
        .is_some_and(|c| candidate.to_lowercase() == c.to_lowercase())
}

fn check(cancel: &CancellationSignal) -> StoreResult<()> {
    if cancel.is_cancelled() {
        Err(StoreError::Cancelled)
    } else {
        Ok(())
    }
}

impl UserStore for InMemoryUserStore {
    fn get<'a>(
        &'a self,
        id: i32,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Option<User>>> {
        Box::pin(async move {
            check(cancel)?;
            Ok(self.users.read().by_id.get(&id).cloned())
        })
    }

    fn find<'a>(
        &'a self,
        given_names: Option<&'a str>,
        last_name: Option<&'a str>,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Vec<User>>> {
        Box::pin(async move {
            check(cancel)?;
            Ok(self
                .users
                .read()
                .by_id
                .values()
                .filter(|u| {
                    name_matches(&u.given_names, given_names) || name_matches(&u.last_name, last_name)
                })
                .cloned()
                .collect())
        })
    }

    fn list_page<'a>(
        &'a self,
        page: i32,
        page_size: i32,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Vec<User>>> {
        Box::pin(async move {
            check(cancel)?;
            let (Ok(page), Ok(size)) = (usize::try_from(page), usize::try_from(page_size)) else {
                return Ok(Vec::new());
            };
            if page == 0 {
                return Ok(Vec::new());
            }
            Ok(self
                .users
                .read()
                .by_id
                .values()
                .skip((page - 1).saturating_mul(size))
                .take(size)
                .cloned()
                .collect())
        })
    }

    fn count<'a>(&'a self, cancel: &'a CancellationSignal) -> BoxFuture<'a, StoreResult<usize>> {
        Box::pin(async move {
            check(cancel)?;
            Ok(self.len())
        })
    }

    fn add<'a>(
        &'a self,
        mut user: User,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<User>> {
        Box::pin(async move {
            check(cancel)?;
            user.id = 0;
            self.users.write().insert(user)
        })
    }

    fn update<'a>(
        &'a self,
        user: User,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<User>> {
        Box::pin(async move {
            check(cancel)?;
            let mut users = self.users.write();
            match users.by_id.get_mut(&user.id) {
                Some(stored) => {
                    *stored = user.clone();
                    Ok(user)
                }
                None => Err(StoreError::Missing { id: user.id }),
            }
        })
    }

    fn delete<'a>(
        &'a self,
        id: i32,
        cancel: &'a CancellationSignal,
    ) -> BoxFuture<'a, StoreResult<Option<User>>> {
        Box::pin(async move {
            check(cancel)?;
            Ok(self.users.write().by_id.remove(&id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signal() -> CancellationSignal {
        CancellationSignal::new()
    }

    #[tokio::test]
    async fn test_add_fails_when_ids_are_exhausted() {
        let mut last = User::new("Max", "Int");
        last.id = i32::MAX;
        let store = InMemoryUserStore::with_users([last]).unwrap();

        let error = store
            .add(User::new("One", "Toomany"), &signal())
            .await
            .unwrap_err();
        assert!(matches!(error, StoreError::Backend(_)));
        assert_eq!(store.len(), 1);

        let error = HermesError::from(error);
        assert!(!error.category().is_client_error());
    }

    #[test]
    fn test_with_users_reports_exhausted_ids() {
        let mut last = User::new("Max", "Int");
        last.id = i32::MAX;
        let result = InMemoryUserStore::with_users([last, User::new("Ada", "Lovelace")]);
        assert!(matches!(result, Err(StoreError::Backend(_))));
    }

    #[tokio::test]
    async fn test_seeded_store() {
        let store = InMemoryUserStore::seeded();
        assert_eq!(store.len(), 10);
        let user = store.get(7, &signal()).await.unwrap().unwrap();
        assert_eq!(user.last_name, "Hamilton");
        assert!(store.get(42, &signal()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_add_assigns_increasing_ids() {
        let store = InMemoryUserStore::seeded();
        let first = store.add(User::new("Linus", "Torvalds"), &signal()).await.unwrap();
        let second = store.add(User::new("Guido", "van Rossum"), &signal()).await.unwrap();
        assert_eq!(first.id, 11);
        assert_eq!(second.id, 12);
        assert_eq!(store.count(&signal()).await.unwrap(), 12);
    }

    #[tokio::test]
    async fn test_find_matches_either_name_ignoring_case() {
        let store = InMemoryUserStore::seeded();
        let found = store
            .find(Some("ada"), Some("TURING"), &signal())
            .await
            .unwrap();
        let ids: Vec<_> = found.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![1, 2]);

        let none = store.find(Some(""), None, &signal()).await.unwrap();
        assert!(none.is_empty());
    }

    #[tokio::test]
    async fn test_list_page() {
        let store = InMemoryUserStore::seeded();
        let page = store.list_page(2, 4, &signal()).await.unwrap();
        let ids: Vec<_> = page.iter().map(|u| u.id).collect();
        assert_eq!(ids, vec![5, 6, 7, 8]);

        assert_eq!(store.list_page(3, 4, &signal()).await.unwrap().len(), 2);
        assert!(store.list_page(4, 4, &signal()).await.unwrap().is_empty());
        assert!(store.list_page(0, 4, &signal()).await.unwrap().is_empty());
        assert!(store.list_page(1, -1, &signal()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_missing_user() {
        let store = InMemoryUserStore::new();
        let mut user = User::new("Nobody", "Here");
        user.id = 42;
        let err = store.update(user, &signal()).await.unwrap_err();
        assert!(matches!(err, StoreError::Missing { id: 42 }));

        match HermesError::from(err) {
            HermesError::NotFound { message } => {
                assert_eq!(message, "The user '42' could not be found.");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_delete() {
        let store = InMemoryUserStore::seeded();
        let removed = store.delete(3, &signal()).await.unwrap().unwrap();
        assert_eq!(removed.given_names, "Grace");
        assert!(store.delete(3, &signal()).await.unwrap().is_none());
        assert_eq!(store.len(), 9);
    }

    #[tokio::test]
    async fn test_cancelled_operations() {
        let store = InMemoryUserStore::seeded();
        let cancel = signal();
        cancel.cancel();

        assert!(matches!(store.get(1, &cancel).await, Err(StoreError::Cancelled)));
        assert!(matches!(
            store.add(User::new("A", "B"), &cancel).await,
            Err(StoreError::Cancelled)
        ));
        assert_eq!(store.len(), 10);
        assert!(HermesError::from(StoreError::Cancelled).is_cancelled());
    }

    #[test]
    fn test_backend_error_becomes_domain() {
        let err = HermesError::from(StoreError::Backend(anyhow::anyhow!("disk full")));
        assert_eq!(err.category(), hermes_core::ErrorCategory::Domain);
        assert_eq!(err.to_envelope(None).error.message, "storage failure");
    }
}
