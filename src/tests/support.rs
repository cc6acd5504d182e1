//! In-memory backends shared by the state module tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::api::{ItemBackend, ListQuery, ShareBackend, UploadBackend, UploadFile};
use crate::error::{ClientError, ClientResult};
use crate::push::{PushSource, Subscription};
use crate::types::{
    AddPermissionRequest, Crumb, Item, ItemId, ItemKind, Page, Permission, PermissionLevel,
};

pub fn doc(id: ItemId, name: &str) -> Item {
    Item {
        id,
        name: name.to_string(),
        kind: ItemKind::Document { version: Some(1), doc_type: Some("docx".into()) },
        parent_id: None,
        size: Some(1024),
        owner_email: "owner@example.com".into(),
        owner_name: "Owner".into(),
        created_at: Some("2024-01-01T10:00:00".into()),
        updated_at: Some("2024-01-02T10:00:00".into()),
        deleted_at: None,
        saved: false,
    }
}

pub fn folder(id: ItemId, name: &str) -> Item {
    Item { kind: ItemKind::Folder, size: None, ..doc(id, name) }
}

pub fn docs(ids: std::ops::RangeInclusive<ItemId>) -> Vec<Item> {
    ids.map(|id| doc(id, &format!("doc-{}", id))).collect()
}

pub fn page(items: Vec<Item>, page_no: u32, total_items: u64, has_next: bool) -> Page<Item> {
    Page { page_no, page_size: 20, total_page: 0, has_next, total_items, items }
}

type ListFn = Box<dyn Fn(&ListQuery) -> ClientResult<Page<Item>> + Send + Sync>;

/// Scriptable item, share and upload backend.
pub struct MockBackend {
    list: Mutex<ListFn>,
    list_delays: Mutex<VecDeque<Duration>>,
    pub queries: Mutex<Vec<ListQuery>>,
    pub calls: Mutex<Vec<String>>,
    pub fail_mutations: AtomicBool,
    crumbs: Mutex<HashMap<ItemId, Vec<Crumb>>>,
    pub fail_crumbs: AtomicBool,
    /// keyword -> (delay, results); a missing keyword fails the search.
    search: Mutex<HashMap<String, (Duration, Page<Item>)>>,
    pub searches: Mutex<Vec<String>>,
    pub share_allowed: AtomicBool,
    pub permission_checks: Mutex<Vec<(ItemId, PermissionLevel)>>,
    pub permissions_added: Mutex<Vec<AddPermissionRequest>>,
    pub uploads: Mutex<Vec<(Option<ItemId>, Uuid, Vec<String>)>>,
    pub fail_upload: AtomicBool,
    pub cancelled: Mutex<Vec<Uuid>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            list: Mutex::new(Box::new(|q: &ListQuery| Ok(Page::empty(q.size)))),
            list_delays: Mutex::new(VecDeque::new()),
            queries: Mutex::new(Vec::new()),
            calls: Mutex::new(Vec::new()),
            fail_mutations: AtomicBool::new(false),
            crumbs: Mutex::new(HashMap::new()),
            fail_crumbs: AtomicBool::new(false),
            search: Mutex::new(HashMap::new()),
            searches: Mutex::new(Vec::new()),
            share_allowed: AtomicBool::new(true),
            permission_checks: Mutex::new(Vec::new()),
            permissions_added: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
            fail_upload: AtomicBool::new(false),
            cancelled: Mutex::new(Vec::new()),
        }
    }

    pub fn set_list<F>(&self, f: F)
    where
        F: Fn(&ListQuery) -> ClientResult<Page<Item>> + Send + Sync + 'static,
    {
        *self.list.lock().unwrap() = Box::new(f);
    }

    /// Delays the next list call; calls beyond the queued delays answer at once.
    pub fn delay_next_list(&self, delay: Duration) {
        self.list_delays.lock().unwrap().push_back(delay);
    }

    pub fn set_crumbs(&self, folder: ItemId, crumbs: &[(ItemId, &str)]) {
        let crumbs = crumbs.iter().map(|(id, name)| Crumb { id: *id, name: name.to_string() }).collect();
        self.crumbs.lock().unwrap().insert(folder, crumbs);
    }

    pub fn set_search(&self, keyword: &str, delay: Duration, items: Vec<Item>) {
        let total = items.len() as u64;
        self.search.lock().unwrap().insert(keyword.to_string(), (delay, page(items, 0, total, false)));
    }

    pub fn queries(&self) -> Vec<ListQuery> {
        self.queries.lock().unwrap().clone()
    }

    pub fn last_query(&self) -> ListQuery {
        self.queries.lock().unwrap().last().cloned().expect("no list call recorded")
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn mutation(&self, call: String) -> ClientResult<()> {
        self.calls.lock().unwrap().push(call);
        if self.fail_mutations.load(Ordering::SeqCst) {
            return Err(ClientError::Http { status: 500, message: "backend unavailable".into() });
        }
        Ok(())
    }
}

#[async_trait]
impl ItemBackend for MockBackend {
    async fn list_items(&self, query: &ListQuery) -> ClientResult<Page<Item>> {
        self.queries.lock().unwrap().push(query.clone());
        let delay = self.list_delays.lock().unwrap().pop_front();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let list = self.list.lock().unwrap();
        (*list)(query)
    }

    async fn rename_item(&self, id: ItemId, name: &str) -> ClientResult<Item> {
        self.mutation(format!("rename {} {}", id, name))?;
        Ok(doc(id, name))
    }

    async fn copy_document(&self, id: ItemId) -> ClientResult<Item> {
        self.mutation(format!("copy {}", id))?;
        Ok(doc(id + 1000, &format!("Copy of doc-{}", id)))
    }

    async fn trash_item(&self, id: ItemId) -> ClientResult<()> {
        self.mutation(format!("trash {}", id))
    }

    async fn restore_item(&self, id: ItemId) -> ClientResult<()> {
        self.mutation(format!("restore {}", id))
    }

    async fn delete_forever(&self, id: ItemId) -> ClientResult<()> {
        self.mutation(format!("delete {}", id))
    }

    async fn clean_trash(&self) -> ClientResult<()> {
        self.mutation("clean-trash".to_string())
    }

    async fn save_item(&self, id: ItemId) -> ClientResult<()> {
        self.mutation(format!("save {}", id))
    }

    async fn unsave_item(&self, id: ItemId) -> ClientResult<()> {
        self.mutation(format!("unsave {}", id))
    }

    async fn restore_version(&self, id: ItemId, version: i32) -> ClientResult<Item> {
        self.mutation(format!("restore-version {} {}", id, version))?;
        let mut item = doc(id, &format!("doc-{}", id));
        item.kind = ItemKind::Document { version: Some(version), doc_type: Some("xlsx".into()) };
        item.size = Some(4096);
        item.updated_at = Some("2024-03-01T08:00:00".into());
        Ok(item)
    }

    async fn create_folder(&self, name: &str, parent: Option<ItemId>) -> ClientResult<Item> {
        self.mutation(format!("mkdir {} {:?}", name, parent))?;
        let mut item = folder(500, name);
        item.parent_id = parent;
        Ok(item)
    }

    async fn breadcrumbs(&self, folder: ItemId) -> ClientResult<Vec<Crumb>> {
        if self.fail_crumbs.load(Ordering::SeqCst) {
            return Err(ClientError::Network("connection reset".into()));
        }
        self.crumbs.lock().unwrap().get(&folder).cloned().ok_or_else(|| ClientError::NotFound("folder".into()))
    }

    async fn search_documents(&self, keyword: &str, _page: u32, _size: u32) -> ClientResult<Page<Item>> {
        self.searches.lock().unwrap().push(keyword.to_string());
        let entry = self.search.lock().unwrap().get(keyword).cloned();
        match entry {
            Some((delay, results)) => {
                tokio::time::sleep(delay).await;
                Ok(results)
            }
            None => Err(ClientError::Http { status: 500, message: "search index offline".into() }),
        }
    }
}

#[async_trait]
impl ShareBackend for MockBackend {
    async fn check_permission(&self, item: ItemId, level: PermissionLevel) -> ClientResult<bool> {
        self.permission_checks.lock().unwrap().push((item, level));
        Ok(self.share_allowed.load(Ordering::SeqCst))
    }

    async fn add_permission(&self, req: &AddPermissionRequest) -> ClientResult<Permission> {
        self.permissions_added.lock().unwrap().push(req.clone());
        Ok(Permission { user_id: Some(9), email: req.email.clone(), name: None, permission: req.permission })
    }
}

#[async_trait]
impl UploadBackend for MockBackend {
    async fn upload_files(
        &self,
        folder: Option<ItemId>,
        upload_id: Uuid,
        files: Vec<UploadFile>,
    ) -> ClientResult<()> {
        let names = files.into_iter().map(|f| f.name).collect();
        self.uploads.lock().unwrap().push((folder, upload_id, names));
        if self.fail_upload.load(Ordering::SeqCst) {
            return Err(ClientError::Http { status: 413, message: "file too large".into() });
        }
        Ok(())
    }

    async fn cancel_upload(&self, upload_id: Uuid) -> ClientResult<()> {
        self.cancelled.lock().unwrap().push(upload_id);
        Ok(())
    }
}

/// Push source whose messages are injected by the test.
pub struct MockPush {
    senders: Mutex<HashMap<String, mpsc::UnboundedSender<String>>>,
    pub unsubscribed: Arc<Mutex<Vec<String>>>,
    pub fail: AtomicBool,
}

impl MockPush {
    pub fn new() -> Self {
        Self {
            senders: Mutex::new(HashMap::new()),
            unsubscribed: Arc::new(Mutex::new(Vec::new())),
            fail: AtomicBool::new(false),
        }
    }

    /// Delivers a message body; false when nobody listens on `destination`.
    pub fn send(&self, destination: &str, body: &str) -> bool {
        match self.senders.lock().unwrap().get(destination) {
            Some(tx) => tx.send(body.to_string()).is_ok(),
            None => false,
        }
    }

    pub fn is_subscribed(&self, destination: &str) -> bool {
        self.senders.lock().unwrap().get(destination).map(|tx| !tx.is_closed()).unwrap_or(false)
    }

    pub fn unsubscribed(&self) -> Vec<String> {
        self.unsubscribed.lock().unwrap().clone()
    }

    /// Drops every sender, as a closed connection does.
    pub fn disconnect(&self) {
        self.senders.lock().unwrap().clear();
    }
}

#[async_trait]
impl PushSource for MockPush {
    async fn subscribe(&self, destination: &str) -> ClientResult<Subscription> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ClientError::Push("not connected".into()));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        self.senders.lock().unwrap().insert(destination.to_string(), tx);
        let log = self.unsubscribed.clone();
        let dest = destination.to_string();
        Ok(Subscription::new(destination, rx, move || log.lock().unwrap().push(dest)))
    }
}
