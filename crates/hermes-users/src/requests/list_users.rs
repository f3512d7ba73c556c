//! Page through all users.

use std::sync::Arc;

use hermes_core::{BoxFuture, DispatchContext, Handler, HermesResult, Request, RuleSet};
use hermes_pipeline::DispatcherBuilder;
use serde::{Deserialize, Serialize};

use crate::dto::{PaginatedDto, UserDto};
use crate::store::UserStore;

/// Default page size.
pub const DEFAULT_ITEMS_PER_PAGE: i32 = 10;

/// Returns page `page_number` (1-based) of all users in id order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListUsersQuery {
    /// Page number, starting at 1.
    #[serde(default)]
    pub page_number: i32,
    /// Page size.
    #[serde(default = "default_items_per_page")]
    pub items_per_page: i32,
}

fn default_items_per_page() -> i32 {
    DEFAULT_ITEMS_PER_PAGE
}

impl ListUsersQuery {
    /// Requests `page_number` with the default page size.
    pub fn page(page_number: i32) -> Self {
        Self {
            page_number,
            ..Self::default()
        }
    }
}

impl Default for ListUsersQuery {
    fn default() -> Self {
        Self {
            page_number: 0,
            items_per_page: DEFAULT_ITEMS_PER_PAGE,
        }
    }
}

impl Request for ListUsersQuery {
    type Response = PaginatedDto<Vec<UserDto>>;
}

/// Whether a page after `page_number` exists for `total` items.
pub fn has_next_page(page_number: i32, items_per_page: i32, total: usize) -> bool {
    let (Ok(page), Ok(size)) = (usize::try_from(page_number), usize::try_from(items_per_page))
    else {
        return false;
    };
    if size == 0 {
        return false;
    }
    page < total.div_ceil(size)
}

/// Handler for [`ListUsersQuery`].
pub struct ListUsersHandler {
    store: Arc<dyn UserStore>,
}

impl ListUsersHandler {
    /// Creates the handler.
    pub fn new(store: Arc<dyn UserStore>) -> Self {
        Self { store }
    }
}

impl Handler<ListUsersQuery> for ListUsersHandler {
    fn handle<'a>(
        &'a self,
        ctx: &'a DispatchContext,
        query: ListUsersQuery,
    ) -> BoxFuture<'a, HermesResult<PaginatedDto<Vec<UserDto>>>> {
        Box::pin(async move {
            let cancel = ctx.cancellation();
            let users = self
                .store
                .list_page(query.page_number, query.items_per_page, cancel)
                .await?;
            let total = self.store.count(cancel).await?;

            Ok(PaginatedDto {
                data: users.iter().map(UserDto::from).collect(),
                has_next_page: has_next_page(query.page_number, query.items_per_page, total),
            })
        })
    }
}

pub(crate) fn register(builder: DispatcherBuilder, store: &Arc<dyn UserStore>) -> DispatcherBuilder {
    builder
        .handler::<ListUsersQuery, _>(ListUsersHandler::new(Arc::clone(store)))
        .validator::<ListUsersQuery>(
            RuleSet::new()
                .greater_than("PageNumber", 0, |q: &ListUsersQuery| q.page_number)
                .greater_than("ItemsPerPage", 0, |q: &ListUsersQuery| q.items_per_page),
        )
}
