//! REST client for the drive backend.
//!
//! [`ApiClient`] owns the HTTP client, the base URL and the session store;
//! endpoint wrappers are grouped by resource in the submodules. The state
//! modules never talk to [`ApiClient`] directly but to the [`ItemBackend`],
//! [`ShareBackend`] and [`UploadBackend`] traits it implements.

pub mod documents;
pub mod folders;
pub mod items;
pub mod sharing;

use std::path::Path;

use async_trait::async_trait;
use reqwest::{RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;
use url::Url;
use uuid::Uuid;

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::metrics::Metrics;
use crate::session::SessionStore;
use crate::types::{AddPermissionRequest, Crumb, Item, ItemId, Page, Permission, PermissionLevel, ViewMode};

/// Identity of one list request: view, filter tokens and offset page.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ListQuery {
    pub view: ViewMode,
    pub tokens: Vec<String>,
    pub page: u32,
    pub size: u32,
}

impl ListQuery {
    pub fn path(&self) -> &'static str {
        self.view.list_path()
    }

    /// `page`, `size`, then one `items` pair per filter token, in order.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = vec![
            ("page".to_string(), self.page.to_string()),
            ("size".to_string(), self.size.to_string()),
        ];
        pairs.extend(self.tokens.iter().map(|t| ("items".to_string(), t.clone())));
        pairs
    }
}

/// A file queued for upload.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadFile {
    pub name: String,
    pub bytes: Vec<u8>,
}

impl UploadFile {
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self { name: name.into(), bytes }
    }

    pub async fn from_path(path: &Path) -> ClientResult<Self> {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .ok_or_else(|| ClientError::InvalidInput(format!("not a file: {}", path.display())))?;
        let bytes = tokio::fs::read(path).await?;
        Ok(Self { name, bytes })
    }
}

/// Item operations used by the directory, search and breadcrumb state.
#[async_trait]
pub trait ItemBackend: Send + Sync {
    async fn list_items(&self, query: &ListQuery) -> ClientResult<Page<Item>>;
    async fn rename_item(&self, id: ItemId, name: &str) -> ClientResult<Item>;
    async fn copy_document(&self, id: ItemId) -> ClientResult<Item>;
    async fn trash_item(&self, id: ItemId) -> ClientResult<()>;
    async fn restore_item(&self, id: ItemId) -> ClientResult<()>;
    async fn delete_forever(&self, id: ItemId) -> ClientResult<()>;
    async fn clean_trash(&self) -> ClientResult<()>;
    async fn save_item(&self, id: ItemId) -> ClientResult<()>;
    async fn unsave_item(&self, id: ItemId) -> ClientResult<()>;
    async fn restore_version(&self, id: ItemId, version: i32) -> ClientResult<Item>;
    async fn create_folder(&self, name: &str, parent: Option<ItemId>) -> ClientResult<Item>;
    async fn breadcrumbs(&self, folder: ItemId) -> ClientResult<Vec<Crumb>>;
    async fn search_documents(&self, keyword: &str, page: u32, size: u32) -> ClientResult<Page<Item>>;
}

/// Permission operations used by the share flow.
#[async_trait]
pub trait ShareBackend: Send + Sync {
    async fn check_permission(&self, item: ItemId, level: PermissionLevel) -> ClientResult<bool>;
    async fn add_permission(&self, req: &AddPermissionRequest) -> ClientResult<Permission>;
}

/// Upload operations used by the upload orchestrator.
#[async_trait]
pub trait UploadBackend: Send + Sync {
    async fn upload_files(
        &self,
        folder: Option<ItemId>,
        upload_id: Uuid,
        files: Vec<UploadFile>,
    ) -> ClientResult<()>;
    async fn cancel_upload(&self, upload_id: Uuid) -> ClientResult<()>;
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base: String,
    session: SessionStore,
    metrics: Metrics,
}

impl ApiClient {
    pub fn new(cfg: &ClientConfig, session: SessionStore, metrics: Metrics) -> ClientResult<Self> {
        // Parse once to reject garbage early; requests are built by concatenation
        // so a base path like `/api` is preserved.
        Url::parse(&cfg.api.base_url)?;
        let http = reqwest::Client::builder()
            .timeout(cfg.request_timeout())
            .user_agent(concat!("drivedesk/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::Network(e.to_string()))?;
        Ok(Self {
            http,
            base: cfg.api.base_url.trim_end_matches('/').to_string(),
            session,
            metrics,
        })
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Absolute URL for an API path such as `/items/42`.
    pub fn url(&self, path: &str) -> ClientResult<Url> {
        Ok(Url::parse(&format!("{}{}", self.base, path))?)
    }

    /// Absolute URL with the access token as a query parameter, for links
    /// opened outside the client (downloads, editor document URLs).
    pub fn url_with_token(&self, path: &str) -> ClientResult<Url> {
        let mut url = self.url(path)?;
        url.query_pairs_mut().append_pair("token", &self.session.bearer()?);
        Ok(url)
    }

    pub(crate) fn request(&self, method: reqwest::Method, path: &str) -> ClientResult<RequestBuilder> {
        let token = self.session.bearer()?;
        Ok(self.http.request(method, self.url(path)?).bearer_auth(token))
    }

    /// Sends a request and maps any non-2xx status onto a [`ClientError`].
    pub(crate) async fn send(&self, req: RequestBuilder) -> ClientResult<Response> {
        self.metrics.inc_requests_sent();
        let resp = match req.send().await {
            Ok(resp) => resp,
            Err(e) => {
                self.metrics.inc_requests_failed();
                tracing::error!("request failed: {}", e);
                return Err(e.into());
            }
        };
        let status = resp.status();
        tracing::debug!(url = %resp.url(), status = status.as_u16(), "response");
        if status.is_success() {
            return Ok(resp);
        }
        self.metrics.inc_requests_failed();
        let body = resp.text().await.unwrap_or_default();
        let err = ClientError::from_status(status.as_u16(), &body);
        tracing::error!(status = status.as_u16(), "backend error: {}", err);
        Err(err)
    }

    pub(crate) async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(String, String)],
    ) -> ClientResult<T> {
        let req = self.request(reqwest::Method::GET, path)?.query(query);
        let resp = self.send(req).await?;
        Ok(resp.json().await?)
    }

    pub(crate) async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: reqwest::Method,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let req = self.request(method, path)?.json(body);
        let resp = self.send(req).await?;
        Ok(resp.json().await?)
    }

    /// For endpoints whose response body is ignored.
    pub(crate) async fn send_empty(&self, method: reqwest::Method, path: &str) -> ClientResult<()> {
        let req = self.request(method, path)?;
        self.send(req).await?;
        Ok(())
    }

    pub(crate) async fn get_bytes(&self, path: &str) -> ClientResult<Vec<u8>> {
        let req = self.request(reqwest::Method::GET, path)?;
        let resp = self.send(req).await?;
        Ok(resp.bytes().await?.to_vec())
    }
}

#[async_trait]
impl ItemBackend for ApiClient {
    async fn list_items(&self, query: &ListQuery) -> ClientResult<Page<Item>> {
        items::list(self, query).await
    }

    async fn rename_item(&self, id: ItemId, name: &str) -> ClientResult<Item> {
        items::rename(self, id, name).await
    }

    async fn copy_document(&self, id: ItemId) -> ClientResult<Item> {
        documents::copy(self, id).await
    }

    async fn trash_item(&self, id: ItemId) -> ClientResult<()> {
        items::trash(self, id).await
    }

    async fn restore_item(&self, id: ItemId) -> ClientResult<()> {
        items::restore(self, id).await
    }

    async fn delete_forever(&self, id: ItemId) -> ClientResult<()> {
        items::delete_forever(self, id).await
    }

    async fn clean_trash(&self) -> ClientResult<()> {
        items::clean_trash(self).await
    }

    async fn save_item(&self, id: ItemId) -> ClientResult<()> {
        sharing::save_item(self, id).await
    }

    async fn unsave_item(&self, id: ItemId) -> ClientResult<()> {
        sharing::unsave_item(self, id).await
    }

    async fn restore_version(&self, id: ItemId, version: i32) -> ClientResult<Item> {
        documents::restore_version(self, id, version).await
    }

    async fn create_folder(&self, name: &str, parent: Option<ItemId>) -> ClientResult<Item> {
        folders::create(self, name, parent).await
    }

    async fn breadcrumbs(&self, folder: ItemId) -> ClientResult<Vec<Crumb>> {
        folders::breadcrumbs(self, folder).await
    }

    async fn search_documents(&self, keyword: &str, page: u32, size: u32) -> ClientResult<Page<Item>> {
        documents::search_metadata(self, keyword, page, size).await
    }
}

#[async_trait]
impl ShareBackend for ApiClient {
    async fn check_permission(&self, item: ItemId, level: PermissionLevel) -> ClientResult<bool> {
        sharing::check_permission(self, item, level).await
    }

    async fn add_permission(&self, req: &AddPermissionRequest) -> ClientResult<Permission> {
        sharing::add_permission(self, req).await
    }
}

#[async_trait]
impl UploadBackend for ApiClient {
    async fn upload_files(
        &self,
        folder: Option<ItemId>,
        upload_id: Uuid,
        files: Vec<UploadFile>,
    ) -> ClientResult<()> {
        folders::upload(self, folder, upload_id, files).await
    }

    async fn cancel_upload(&self, upload_id: Uuid) -> ClientResult<()> {
        documents::cancel_upload(self, upload_id).await
    }
}
