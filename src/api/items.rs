use reqwest::Method;

use super::{ApiClient, ItemBackend, ListQuery};
use crate::error::{validation, ClientResult, OptionExt};
use crate::types::{Item, ItemId, Page, RenameRequest, ViewMode};

pub async fn list(api: &ApiClient, query: &ListQuery) -> ClientResult<Page<Item>> {
    tracing::debug!(path = query.path(), page = query.page, tokens = ?query.tokens, "list items");
    api.get_json(query.path(), &query.query_pairs()).await
}

pub async fn rename(api: &ApiClient, id: ItemId, name: &str) -> ClientResult<Item> {
    validation::validate_item_name(name)?;
    let body = RenameRequest { name: name.trim().to_string() };
    api.send_json(Method::PUT, &format!("/items/{}", id), &body).await
}

/// Moves an item to the trash.
pub async fn trash(api: &ApiClient, id: ItemId) -> ClientResult<()> {
    api.send_empty(Method::DELETE, &format!("/items/{}", id)).await
}

pub async fn restore(api: &ApiClient, id: ItemId) -> ClientResult<()> {
    api.send_empty(Method::PUT, &format!("/items/{}/restore", id)).await
}

pub async fn delete_forever(api: &ApiClient, id: ItemId) -> ClientResult<()> {
    api.send_empty(Method::DELETE, &format!("/items/{}/forever", id)).await
}

pub async fn clean_trash(api: &ApiClient) -> ClientResult<()> {
    api.send_empty(Method::DELETE, "/items/trash").await
}

/// Looks an item up by id in the root listings of my drive and
/// shared-with-me, walking every page.
pub async fn find_in_roots(backend: &dyn ItemBackend, id: ItemId, page_size: u32) -> ClientResult<Item> {
    let mut found = None;
    'views: for view in [ViewMode::MyDrive, ViewMode::SharedWithMe] {
        let mut page = 0;
        loop {
            let query = ListQuery { view, tokens: Vec::new(), page, size: page_size };
            let listing = backend.list_items(&query).await?;
            if let Some(item) = listing.items.into_iter().find(|i| i.id == id) {
                found = Some(item);
                break 'views;
            }
            if !listing.has_next {
                break;
            }
            page += 1;
        }
    }
    found.ok_or_not_found(&format!("Item {}", id))
}

/// Distinct owner emails visible to the user, for the owner filter.
pub async fn owner_emails(api: &ApiClient) -> ClientResult<Vec<String>> {
    api.get_json("/items/emails", &[]).await
}
