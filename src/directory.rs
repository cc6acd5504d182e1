//! Item directory state: the paginated, filterable listing of one view.
//!
//! [`DirectoryState`] is pure bookkeeping. Every list request it asks for is a
//! [`FetchTicket`] carrying a monotonic sequence number; only the response to
//! the most recently issued ticket is applied, anything older is stale and
//! dropped. Mutations are reconciled into the loaded items only after the
//! backend confirmed them.
//!
//! [`Directory`] drives the state against an [`ItemBackend`] and reports
//! failures on the [`Notifier`].

use std::collections::HashSet;
use std::future::Future;
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::{ItemBackend, ListQuery};
use crate::error::{validation, ClientError, ClientResult};
use crate::filter::{FilterTokens, FilterValue};
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::types::{Item, ItemAction, ItemId, ItemKind, Page, ViewMode};

/// A list request issued by [`DirectoryState`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTicket {
    pub seq: u64,
    pub query: ListQuery,
    /// Load-more tickets append; all others replace the loaded items.
    pub append: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageOutcome {
    Replaced { count: usize },
    Appended { added: usize, duplicates: usize },
    /// The ticket was superseded; nothing changed.
    Stale,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DirectoryState {
    view: ViewMode,
    tokens: FilterTokens,
    page_no: u32,
    page_size: u32,
    items: Vec<Item>,
    total_items: u64,
    has_next: bool,
    loaded: bool,
    last_seq: u64,
    append_in_flight: bool,
    /// A replacing ticket is pending; the loaded items belong to the old key.
    replace_in_flight: bool,
    /// Ids removed since the last replacing ticket was issued; a response
    /// computed before the removal must not bring them back.
    removed: HashSet<ItemId>,
}

impl DirectoryState {
    pub fn new(view: ViewMode, page_size: u32) -> Self {
        Self {
            view,
            tokens: FilterTokens::new(),
            page_no: 0,
            page_size: page_size.max(1),
            items: Vec::new(),
            total_items: 0,
            has_next: false,
            loaded: false,
            last_seq: 0,
            append_in_flight: false,
            replace_in_flight: false,
            removed: HashSet::new(),
        }
    }

    pub fn view(&self) -> ViewMode {
        self.view
    }

    pub fn tokens(&self) -> &FilterTokens {
        &self.tokens
    }

    /// Current folder, `None` at the root.
    pub fn folder(&self) -> Option<ItemId> {
        self.tokens.parent()
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|i| i.id == id)
    }

    pub fn page_no(&self) -> u32 {
        self.page_no
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    pub fn total_items(&self) -> u64 {
        self.total_items
    }

    pub fn has_next(&self) -> bool {
        self.has_next
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    /// Whether the "load more" control is enabled.
    pub fn can_load_more(&self) -> bool {
        self.loaded && self.has_next && !self.append_in_flight && !self.replace_in_flight
    }

    /// Query for the given page under the current view and filters.
    pub fn query_for(&self, page: u32) -> ListQuery {
        ListQuery {
            view: self.view,
            tokens: self.tokens.as_slice().to_vec(),
            page,
            size: self.page_size,
        }
    }

    fn issue(&mut self, page: u32, append: bool) -> FetchTicket {
        self.last_seq += 1;
        if append {
            self.append_in_flight = true;
        } else {
            self.append_in_flight = false;
            self.replace_in_flight = true;
            self.removed.clear();
            self.page_no = 0;
        }
        FetchTicket { seq: self.last_seq, query: self.query_for(page), append }
    }

    /// Navigates to a folder (`None` = root) and resets to page 0.
    pub fn set_folder(&mut self, id: Option<ItemId>) -> FetchTicket {
        self.tokens.set(&FilterValue::Parent(id));
        self.issue(0, false)
    }

    /// Applies a filter selection. Returns `None` when the tokens did not change.
    pub fn set_filter(&mut self, value: &FilterValue) -> Option<FetchTicket> {
        if !self.tokens.set(value) {
            return None;
        }
        Some(self.issue(0, false))
    }

    pub fn set_filter_with_today(&mut self, value: &FilterValue, today: chrono::NaiveDate) -> Option<FetchTicket> {
        if !self.tokens.set_with_today(value, today) {
            return None;
        }
        Some(self.issue(0, false))
    }

    /// Drops every filter except the folder.
    pub fn clear_filters(&mut self) -> Option<FetchTicket> {
        let folder = self.folder();
        let before = self.tokens.clone();
        self.tokens.clear();
        self.tokens.set(&FilterValue::Parent(folder));
        if self.tokens == before {
            return None;
        }
        Some(self.issue(0, false))
    }

    /// Switches view; folder and filters belong to the old view and are reset.
    pub fn set_view(&mut self, view: ViewMode) -> FetchTicket {
        self.view = view;
        self.tokens.clear();
        self.issue(0, false)
    }

    /// Re-fetches page 0 under the current key.
    pub fn refresh(&mut self) -> FetchTicket {
        self.issue(0, false)
    }

    /// Next page, when there is one and no load-more is already pending.
    pub fn load_more(&mut self) -> Option<FetchTicket> {
        if !self.can_load_more() {
            return None;
        }
        let next = self.page_no + 1;
        Some(self.issue(next, true))
    }

    pub fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.seq == self.last_seq
    }

    /// Applies a list response. Responses to superseded tickets are ignored.
    pub fn apply_page(&mut self, ticket: &FetchTicket, page: Page<Item>) -> PageOutcome {
        if !self.is_current(ticket) {
            return PageOutcome::Stale;
        }
        let before = page.items.len();
        let incoming: Vec<Item> = page.items.into_iter().filter(|i| !self.removed.contains(&i.id)).collect();
        let resurrected = (before - incoming.len()) as u64;
        let server_total = page.total_items.saturating_sub(resurrected);
        self.has_next = page.has_next;

        if ticket.append {
            self.append_in_flight = false;
            let mut seen: HashSet<ItemId> = self.items.iter().map(|i| i.id).collect();
            let mut duplicates = 0;
            let mut added = 0;
            for item in incoming {
                if !seen.insert(item.id) {
                    duplicates += 1;
                    continue;
                }
                self.items.push(item);
                added += 1;
            }
            self.page_no = self.page_no.max(ticket.query.page);
            self.total_items = self.total_items.max(server_total);
            PageOutcome::Appended { added, duplicates }
        } else {
            // A single page never repeats an id, but guard anyway.
            let mut seen = HashSet::new();
            self.items = incoming.into_iter().filter(|i| seen.insert(i.id)).collect();
            self.page_no = ticket.query.page;
            self.total_items = server_total;
            self.loaded = true;
            self.replace_in_flight = false;
            PageOutcome::Replaced { count: self.items.len() }
        }
    }

    /// Marks a failed fetch; the loaded items stay as they were.
    ///
    /// After a failed replace the items still belong to the previous key, so
    /// load-more stays disabled until a refresh succeeds.
    pub fn fetch_failed(&mut self, ticket: &FetchTicket) {
        if !self.is_current(ticket) {
            return;
        }
        if ticket.append {
            self.append_in_flight = false;
        } else {
            self.replace_in_flight = false;
            self.has_next = false;
        }
    }

    /// Rename: only the name of the target changes, order is preserved.
    pub fn apply_rename(&mut self, id: ItemId, name: &str) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.name = name.to_string();
                true
            }
            None => false,
        }
    }

    /// Copy (or create): the new item goes first and counts.
    pub fn apply_inserted(&mut self, item: Item) -> bool {
        if self.items.iter().any(|i| i.id == item.id) {
            return false;
        }
        self.removed.remove(&item.id);
        self.items.insert(0, item);
        self.total_items += 1;
        true
    }

    /// Trash, restore from trash, delete forever: the item leaves this listing.
    pub fn apply_removed(&mut self, id: ItemId) -> bool {
        self.removed.insert(id);
        match self.items.iter().position(|i| i.id == id) {
            Some(pos) => {
                self.items.remove(pos);
                self.total_items = self.total_items.saturating_sub(1);
                true
            }
            None => false,
        }
    }

    /// Empties the listing (clean trash).
    pub fn apply_cleared(&mut self) {
        self.removed.extend(self.items.iter().map(|i| i.id));
        self.items.clear();
        self.total_items = 0;
        self.has_next = false;
    }

    pub fn apply_saved(&mut self, id: ItemId, saved: bool) -> bool {
        match self.items.iter_mut().find(|i| i.id == id) {
            Some(item) => {
                item.saved = saved;
                true
            }
            None => false,
        }
    }

    /// Version restore: copies version, type, size and update time from the
    /// backend's copy of the document.
    pub fn apply_version_restored(&mut self, restored: &Item) -> bool {
        let ItemKind::Document { version, doc_type } = &restored.kind else {
            return false;
        };
        let Some(item) = self.items.iter_mut().find(|i| i.id == restored.id) else {
            return false;
        };
        match &mut item.kind {
            ItemKind::Document { version: v, doc_type: t } => {
                *v = *version;
                *t = doc_type.clone();
            }
            ItemKind::Folder => return false,
        }
        item.size = restored.size;
        item.updated_at = restored.updated_at.clone();
        true
    }
}

/// Read-only copy of the listing for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct DirectorySnapshot {
    pub view: ViewMode,
    pub folder: Option<ItemId>,
    pub tokens: Vec<String>,
    pub items: Vec<Item>,
    pub page_no: u32,
    pub total_items: u64,
    pub has_next: bool,
}

/// Async driver of a [`DirectoryState`].
pub struct Directory {
    backend: Arc<dyn ItemBackend>,
    state: Mutex<DirectoryState>,
    notifier: Notifier,
    metrics: Metrics,
}

impl Directory {
    pub fn new(
        backend: Arc<dyn ItemBackend>,
        view: ViewMode,
        page_size: u32,
        notifier: Notifier,
        metrics: Metrics,
    ) -> Self {
        Self { backend, state: Mutex::new(DirectoryState::new(view, page_size)), notifier, metrics }
    }

    pub async fn snapshot(&self) -> DirectorySnapshot {
        let st = self.state.lock().await;
        DirectorySnapshot {
            view: st.view(),
            folder: st.folder(),
            tokens: st.tokens().as_slice().to_vec(),
            items: st.items().to_vec(),
            page_no: st.page_no(),
            total_items: st.total_items(),
            has_next: st.has_next(),
        }
    }

    pub async fn folder(&self) -> Option<ItemId> {
        self.state.lock().await.folder()
    }

    pub async fn view(&self) -> ViewMode {
        self.state.lock().await.view()
    }

    pub async fn can_load_more(&self) -> bool {
        self.state.lock().await.can_load_more()
    }

    pub async fn open_folder(&self, id: Option<ItemId>) -> ClientResult<PageOutcome> {
        let ticket = self.state.lock().await.set_folder(id);
        self.run(ticket).await
    }

    /// Applies a filter; a no-op selection does not refetch.
    pub async fn set_filter(&self, value: FilterValue) -> ClientResult<Option<PageOutcome>> {
        if let FilterValue::Parent(id) = value {
            return self.open_folder(id).await.map(Some);
        }
        let ticket = self.state.lock().await.set_filter(&value);
        match ticket {
            Some(ticket) => self.run(ticket).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn clear_filters(&self) -> ClientResult<Option<PageOutcome>> {
        let ticket = self.state.lock().await.clear_filters();
        match ticket {
            Some(ticket) => self.run(ticket).await.map(Some),
            None => Ok(None),
        }
    }

    pub async fn set_view(&self, view: ViewMode) -> ClientResult<PageOutcome> {
        let ticket = self.state.lock().await.set_view(view);
        self.run(ticket).await
    }

    pub async fn refresh(&self) -> ClientResult<PageOutcome> {
        let ticket = self.state.lock().await.refresh();
        self.run(ticket).await
    }

    /// Loads the next page. `Ok(None)` when there is nothing more to load.
    pub async fn load_more(&self) -> ClientResult<Option<PageOutcome>> {
        let ticket = self.state.lock().await.load_more();
        match ticket {
            Some(ticket) => self.run(ticket).await.map(Some),
            None => Ok(None),
        }
    }

    async fn run(&self, ticket: FetchTicket) -> ClientResult<PageOutcome> {
        match self.backend.list_items(&ticket.query).await {
            Ok(page) => {
                let outcome = self.state.lock().await.apply_page(&ticket, page);
                match outcome {
                    PageOutcome::Stale => {
                        self.metrics.inc_stale_dropped();
                        tracing::warn!(seq = ticket.seq, "discarding stale list response");
                    }
                    PageOutcome::Appended { duplicates, .. } if duplicates > 0 => {
                        tracing::debug!(duplicates, "dropped items already listed");
                    }
                    _ => {}
                }
                Ok(outcome)
            }
            Err(e) => {
                let current = {
                    let mut st = self.state.lock().await;
                    st.fetch_failed(&ticket);
                    st.is_current(&ticket)
                };
                // A failure of a superseded request is nobody's concern.
                if current {
                    self.notifier.error(format!("Could not load items: {}", e.user_message()));
                }
                Err(e)
            }
        }
    }

    async fn confirm<T, F>(&self, action: &str, call: F) -> ClientResult<T>
    where
        F: Future<Output = ClientResult<T>>,
    {
        call.await.map_err(|e| {
            tracing::error!(action, "mutation failed: {}", e);
            self.notifier.error(format!("{} failed: {}", action, e.user_message()));
            e
        })
    }

    async fn require(&self, id: ItemId, action: ItemAction) -> ClientResult<()> {
        let st = self.state.lock().await;
        if let Some(item) = st.item(id) {
            if !item.allows(action) {
                let err = ClientError::InvalidInput(format!("'{}' does not support {:?}", item.name, action));
                self.notifier.warning(err.user_message());
                return Err(err);
            }
        }
        Ok(())
    }

    pub async fn rename(&self, id: ItemId, name: &str) -> ClientResult<()> {
        if let Err(e) = validation::validate_item_name(name) {
            self.notifier.warning(e.user_message());
            return Err(e);
        }
        self.require(id, ItemAction::Rename).await?;
        let item = self.confirm("Rename", self.backend.rename_item(id, name)).await?;
        self.state.lock().await.apply_rename(id, &item.name);
        self.notifier.success(format!("Renamed to '{}'", item.name));
        Ok(())
    }

    pub async fn copy(&self, id: ItemId) -> ClientResult<Item> {
        self.require(id, ItemAction::Copy).await?;
        let copy = self.confirm("Copy", self.backend.copy_document(id)).await?;
        self.state.lock().await.apply_inserted(copy.clone());
        self.notifier.success(format!("Created '{}'", copy.name));
        Ok(copy)
    }

    pub async fn create_folder(&self, name: &str) -> ClientResult<Item> {
        if let Err(e) = validation::validate_item_name(name) {
            self.notifier.warning(e.user_message());
            return Err(e);
        }
        let parent = self.folder().await;
        let folder = self.confirm("Create folder", self.backend.create_folder(name, parent)).await?;
        self.state.lock().await.apply_inserted(folder.clone());
        self.notifier.success(format!("Folder '{}' created", folder.name));
        Ok(folder)
    }

    pub async fn trash(&self, id: ItemId) -> ClientResult<()> {
        self.require(id, ItemAction::Trash).await?;
        self.confirm("Move to trash", self.backend.trash_item(id)).await?;
        self.state.lock().await.apply_removed(id);
        self.notifier.success("Moved to trash");
        Ok(())
    }

    pub async fn restore(&self, id: ItemId) -> ClientResult<()> {
        self.confirm("Restore", self.backend.restore_item(id)).await?;
        self.state.lock().await.apply_removed(id);
        self.notifier.success("Restored");
        Ok(())
    }

    pub async fn delete_forever(&self, id: ItemId) -> ClientResult<()> {
        self.confirm("Delete", self.backend.delete_forever(id)).await?;
        self.state.lock().await.apply_removed(id);
        self.notifier.success("Deleted forever");
        Ok(())
    }

    pub async fn clean_trash(&self) -> ClientResult<()> {
        self.confirm("Empty trash", self.backend.clean_trash()).await?;
        self.state.lock().await.apply_cleared();
        self.notifier.success("Trash emptied");
        Ok(())
    }

    pub async fn save(&self, id: ItemId) -> ClientResult<()> {
        self.require(id, ItemAction::Save).await?;
        self.confirm("Save", self.backend.save_item(id)).await?;
        self.state.lock().await.apply_saved(id, true);
        Ok(())
    }

    pub async fn unsave(&self, id: ItemId) -> ClientResult<()> {
        self.confirm("Unsave", self.backend.unsave_item(id)).await?;
        self.state.lock().await.apply_saved(id, false);
        Ok(())
    }

    pub async fn restore_version(&self, id: ItemId, version: i32) -> ClientResult<Item> {
        self.require(id, ItemAction::RestoreVersion).await?;
        let restored = self.confirm("Restore version", self.backend.restore_version(id, version)).await?;
        self.state.lock().await.apply_version_restored(&restored);
        self.notifier.success(format!("Restored version {}", version));
        Ok(restored)
    }
}
