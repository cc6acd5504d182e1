use reqwest::multipart::{Form, Part};
use reqwest::Method;
use uuid::Uuid;

use super::{ApiClient, UploadFile};
use crate::error::{validation, ClientError, ClientResult};
use crate::types::{CreateFolderRequest, Crumb, Item, ItemId};

pub async fn create(api: &ApiClient, name: &str, parent: Option<ItemId>) -> ClientResult<Item> {
    validation::validate_item_name(name)?;
    let body = CreateFolderRequest { name: name.trim().to_string(), parent_id: parent };
    api.send_json(Method::POST, "/folders", &body).await
}

/// Ancestor chain of a folder, root-most first, ending with the folder itself.
pub async fn breadcrumbs(api: &ApiClient, id: ItemId) -> ClientResult<Vec<Crumb>> {
    api.get_json(&format!("/folders/{}/breadcrumbs", id), &[]).await
}

/// Downloads a folder as a zip archive.
pub async fn download(api: &ApiClient, id: ItemId) -> ClientResult<Vec<u8>> {
    api.get_bytes(&format!("/folders/{}/download", id)).await
}

/// Direct archive link carrying the access token.
pub fn download_url(api: &ApiClient, id: ItemId) -> ClientResult<url::Url> {
    api.url_with_token(&format!("/folders/{}/download", id))
}

/// Multipart upload; progress and completion arrive on the push channel
/// keyed by the caller's `upload_id`.
pub async fn upload(
    api: &ApiClient,
    folder: Option<ItemId>,
    upload_id: Uuid,
    files: Vec<UploadFile>,
) -> ClientResult<()> {
    if files.is_empty() {
        return Err(ClientError::InvalidInput("no files to upload".into()));
    }
    let mut form = Form::new().text("uploadId", upload_id.to_string());
    if let Some(folder) = folder {
        form = form.text("folderId", folder.to_string());
    }
    for file in files {
        form = form.part("files", Part::bytes(file.bytes).file_name(file.name));
    }
    let req = api.request(Method::POST, "/folders/upload")?.multipart(form);
    api.send(req).await?;
    Ok(())
}
