use reqwest::Method;
use uuid::Uuid;

use super::ApiClient;
use crate::editor::EditorConfig;
use crate::error::{validation, ClientResult};
use crate::types::{CreateDocumentRequest, Item, ItemId, Page};

/// Creates a blank office document.
pub async fn create(api: &ApiClient, req: &CreateDocumentRequest) -> ClientResult<Item> {
    validation::validate_item_name(&req.name)?;
    api.send_json(Method::POST, "/documents", req).await
}

pub async fn copy(api: &ApiClient, id: ItemId) -> ClientResult<Item> {
    api.send_json(Method::POST, &format!("/documents/{}/copy", id), &serde_json::json!({})).await
}

pub async fn download(api: &ApiClient, id: ItemId) -> ClientResult<Vec<u8>> {
    api.get_bytes(&format!("/documents/{}/download", id)).await
}

/// Direct download link carrying the access token.
pub fn download_url(api: &ApiClient, id: ItemId) -> ClientResult<url::Url> {
    api.url_with_token(&format!("/documents/{}/download", id))
}

pub async fn search_metadata(api: &ApiClient, keyword: &str, page: u32, size: u32) -> ClientResult<Page<Item>> {
    let query = vec![
        ("keyword".to_string(), keyword.to_string()),
        ("page".to_string(), page.to_string()),
        ("size".to_string(), size.to_string()),
    ];
    api.get_json("/documents/search-metadata", &query).await
}

pub async fn restore_version(api: &ApiClient, id: ItemId, version: i32) -> ClientResult<Item> {
    validation::validate_positive_number(Some(version as i64), "version")?;
    api.send_json(
        Method::PUT,
        &format!("/documents/{}/versions/{}/restore", id, version),
        &serde_json::json!({}),
    )
    .await
}

pub async fn editor_config(api: &ApiClient, id: ItemId) -> ClientResult<EditorConfig> {
    api.get_json(&format!("/documents/{}/onlyoffice-config", id), &[]).await
}

pub async fn cancel_upload(api: &ApiClient, upload_id: Uuid) -> ClientResult<()> {
    api.send_empty(Method::POST, &format!("/documents/upload/{}/cancel", upload_id)).await
}
