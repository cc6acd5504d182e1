//! Breadcrumb trail from the synthetic root to the current folder.
//!
//! The trail is never grown locally: every navigation replaces it with the
//! server-computed ancestor chain, prefixed with a root entry whose id is
//! [`ROOT_ID`] and whose label depends on the view.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::api::ItemBackend;
use crate::directory::{Directory, PageOutcome};
use crate::error::ClientResult;
use crate::notify::Notifier;
use crate::types::{Crumb, ItemId, ViewMode, ROOT_ID};

/// Where a click on a segment navigates to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavTarget {
    Root,
    Folder(ItemId),
}

impl NavTarget {
    pub fn folder_id(&self) -> Option<ItemId> {
        match self {
            NavTarget::Root => None,
            NavTarget::Folder(id) => Some(*id),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BreadcrumbTrail {
    segments: Vec<Crumb>,
}

impl BreadcrumbTrail {
    pub fn new(root_label: &str) -> Self {
        Self { segments: vec![Crumb { id: ROOT_ID, name: root_label.to_string() }] }
    }

    /// Replaces the whole trail with `root` + the server's ancestors.
    pub fn set_path(&mut self, root_label: &str, crumbs: Vec<Crumb>) {
        let mut segments = Vec::with_capacity(crumbs.len() + 1);
        segments.push(Crumb { id: ROOT_ID, name: root_label.to_string() });
        // The server chain may or may not include a root entry of its own.
        segments.extend(crumbs.into_iter().filter(|c| c.id != ROOT_ID));
        self.segments = segments;
    }

    /// Truncates the trail to `[0..=index]` and returns the navigation target.
    /// Out-of-range indices do nothing.
    pub fn click_segment(&mut self, index: usize) -> Option<NavTarget> {
        let segment = self.segments.get(index)?;
        let target = if segment.id == ROOT_ID { NavTarget::Root } else { NavTarget::Folder(segment.id) };
        self.segments.truncate(index + 1);
        Some(target)
    }

    pub fn segments(&self) -> &[Crumb] {
        &self.segments
    }

    pub fn current(&self) -> &Crumb {
        // Never empty: the root entry is always present.
        &self.segments[self.segments.len() - 1]
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn labels(&self) -> Vec<&str> {
        self.segments.iter().map(|c| c.name.as_str()).collect()
    }
}

/// Folder navigation: moves the directory and re-derives the trail.
pub struct Navigator {
    directory: Arc<Directory>,
    backend: Arc<dyn ItemBackend>,
    trail: Mutex<BreadcrumbTrail>,
    notifier: Notifier,
    nav_seq: AtomicU64,
}

impl Navigator {
    pub async fn new(directory: Arc<Directory>, backend: Arc<dyn ItemBackend>, notifier: Notifier) -> Self {
        let root_label = directory.view().await.root_label();
        Self {
            directory,
            backend,
            trail: Mutex::new(BreadcrumbTrail::new(root_label)),
            notifier,
            nav_seq: AtomicU64::new(0),
        }
    }

    pub fn directory(&self) -> &Arc<Directory> {
        &self.directory
    }

    pub async fn trail(&self) -> BreadcrumbTrail {
        self.trail.lock().await.clone()
    }

    /// Opens a folder (`None` = root) and refreshes the trail.
    pub async fn navigate(&self, target: Option<ItemId>) -> ClientResult<PageOutcome> {
        let seq = self.nav_seq.fetch_add(1, Ordering::SeqCst) + 1;
        let crumbs = async {
            match target {
                Some(id) => self.backend.breadcrumbs(id).await,
                None => Ok(Vec::new()),
            }
        };
        let (listing, crumbs) = tokio::join!(self.directory.open_folder(target), crumbs);

        if self.nav_seq.load(Ordering::SeqCst) != seq {
            tracing::debug!(seq, "newer navigation in progress, keeping its trail");
            return listing;
        }
        // The directory is keyed to the target even when its listing failed,
        // so the trail follows it either way.
        let outcome = listing;
        let root_label = self.directory.view().await.root_label();
        match crumbs {
            Ok(crumbs) => self.trail.lock().await.set_path(root_label, crumbs),
            Err(e) => {
                tracing::warn!("could not load breadcrumbs: {}", e);
                self.notifier.warning(format!("Could not load folder path: {}", e.user_message()));
            }
        }
        outcome
    }

    /// Switches view; the trail collapses to the new view's root.
    pub async fn switch_view(&self, view: ViewMode) -> ClientResult<PageOutcome> {
        self.nav_seq.fetch_add(1, Ordering::SeqCst);
        *self.trail.lock().await = BreadcrumbTrail::new(view.root_label());
        self.directory.set_view(view).await
    }

    /// Handles a click on a trail segment. `Ok(None)` for an invalid index.
    pub async fn click_segment(&self, index: usize) -> ClientResult<Option<PageOutcome>> {
        let target = self.trail.lock().await.click_segment(index);
        match target {
            Some(target) => self.navigate(target.folder_id()).await.map(Some),
            None => Ok(None),
        }
    }
}
