//! Saved items, permissions, shared links and user lookup.

use reqwest::Method;
use serde::Deserialize;

use super::ApiClient;
use crate::error::{validation, ClientResult};
use crate::types::{
    AddPermissionRequest, CreateSharedLinkRequest, Item, ItemId, Page, Permission, PermissionLevel,
    SharedLink, User,
};

pub async fn save_item(api: &ApiClient, id: ItemId) -> ClientResult<()> {
    api.send_empty(Method::POST, &format!("/saved-items/{}", id)).await
}

pub async fn unsave_item(api: &ApiClient, id: ItemId) -> ClientResult<()> {
    api.send_empty(Method::DELETE, &format!("/saved-items/{}", id)).await
}

pub async fn list_saved(api: &ApiClient, page: u32, size: u32) -> ClientResult<Page<Item>> {
    let query = vec![("page".to_string(), page.to_string()), ("size".to_string(), size.to_string())];
    let mut page: Page<Item> = api.get_json("/saved-items", &query).await?;
    for item in &mut page.items {
        item.saved = true;
    }
    Ok(page)
}

pub async fn permissions(api: &ApiClient, item: ItemId) -> ClientResult<Vec<Permission>> {
    api.get_json(&format!("/permissions/{}", item), &[]).await
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CheckResponse {
    Flag(bool),
    Object { allowed: bool },
}

pub async fn check_permission(api: &ApiClient, item: ItemId, level: PermissionLevel) -> ClientResult<bool> {
    let query = vec![
        ("itemId".to_string(), item.to_string()),
        ("permission".to_string(), level.as_str().to_string()),
    ];
    let resp: CheckResponse = api.get_json("/permissions/check", &query).await?;
    Ok(match resp {
        CheckResponse::Flag(allowed) | CheckResponse::Object { allowed } => allowed,
    })
}

pub async fn add_permission(api: &ApiClient, req: &AddPermissionRequest) -> ClientResult<Permission> {
    validation::validate_email(&req.email)?;
    api.send_json(Method::POST, "/permissions", req).await
}

pub async fn shared_links(api: &ApiClient, item: ItemId) -> ClientResult<Vec<SharedLink>> {
    let query = vec![("itemId".to_string(), item.to_string())];
    api.get_json("/shared-links", &query).await
}

pub async fn create_shared_link(api: &ApiClient, req: &CreateSharedLinkRequest) -> ClientResult<SharedLink> {
    api.send_json(Method::POST, "/shared-links", req).await
}

pub async fn delete_shared_link(api: &ApiClient, link_id: i64) -> ClientResult<()> {
    api.send_empty(Method::DELETE, &format!("/shared-links/{}", link_id)).await
}

pub async fn search_users(api: &ApiClient, query: &str) -> ClientResult<Vec<User>> {
    let q = vec![("query".to_string(), query.trim().to_string())];
    api.get_json("/users/search", &q).await
}

pub async fn user_info(api: &ApiClient) -> ClientResult<User> {
    api.get_json("/users/info", &[]).await
}
