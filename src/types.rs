//! Wire types shared between the API client and the state modules.
//!
//! These mirror the backend's JSON (camelCase) and are only ever produced by
//! the backend; the client never fabricates an [`Item`].

use serde::{Deserialize, Serialize};

/// Identifier of a document or folder.
pub type ItemId = i64;

/// Sentinel id of the synthetic root entry of a breadcrumb trail.
pub const ROOT_ID: ItemId = 0;

/// The plain discriminant of an item, used in filters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemType {
    Document,
    Folder,
}

impl ItemType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemType::Document => "DOCUMENT",
            ItemType::Folder => "FOLDER",
        }
    }
}

/// Variant-specific data of an item, tagged by `itemType` on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "itemType", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ItemKind {
    Document {
        #[serde(default)]
        version: Option<i32>,
        /// File type / extension as reported by the backend (`docx`, `xlsx`, ..).
        #[serde(default, rename = "type")]
        doc_type: Option<String>,
    },
    Folder,
}

/// A document or folder as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: ItemId,
    pub name: String,
    #[serde(flatten)]
    pub kind: ItemKind,
    #[serde(default)]
    pub parent_id: Option<ItemId>,
    #[serde(default)]
    pub size: Option<i64>,
    #[serde(default)]
    pub owner_email: String,
    #[serde(default)]
    pub owner_name: String,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
    #[serde(default)]
    pub deleted_at: Option<String>,
    /// Local mirror of membership in the saved-items relation.
    #[serde(default, skip_serializing)]
    pub saved: bool,
}

/// What the user can do with an item; availability depends on the variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemAction {
    /// Browse into a folder.
    Navigate,
    /// Open a document in the embedded editor.
    OpenEditor,
    Download,
    Share,
    Copy,
    Rename,
    Trash,
    Save,
    RestoreVersion,
}

impl Item {
    pub fn item_type(&self) -> ItemType {
        match self.kind {
            ItemKind::Document { .. } => ItemType::Document,
            ItemKind::Folder => ItemType::Folder,
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self.kind, ItemKind::Folder)
    }

    pub fn is_trashed(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Actions offered for this item.
    pub fn actions(&self) -> Vec<ItemAction> {
        if self.is_trashed() {
            return Vec::new();
        }
        match &self.kind {
            ItemKind::Document { version, .. } => {
                let mut actions = vec![
                    ItemAction::OpenEditor,
                    ItemAction::Download,
                    ItemAction::Share,
                    ItemAction::Copy,
                    ItemAction::Rename,
                    ItemAction::Trash,
                    ItemAction::Save,
                ];
                if version.map(|v| v > 1).unwrap_or(false) {
                    actions.push(ItemAction::RestoreVersion);
                }
                actions
            }
            ItemKind::Folder => vec![
                ItemAction::Navigate,
                ItemAction::Download,
                ItemAction::Share,
                ItemAction::Rename,
                ItemAction::Trash,
                ItemAction::Save,
            ],
        }
    }

    pub fn allows(&self, action: ItemAction) -> bool {
        self.actions().contains(&action)
    }
}

/// Offset-based page as returned by every list endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub page_no: u32,
    pub page_size: u32,
    #[serde(default)]
    pub total_page: u32,
    pub has_next: bool,
    pub total_items: u64,
    pub items: Vec<T>,
}

impl<T> Page<T> {
    pub fn empty(page_size: u32) -> Self {
        Self { page_no: 0, page_size, total_page: 0, has_next: false, total_items: 0, items: Vec::new() }
    }
}

/// Which listing a view shows. Part of every list request's identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ViewMode {
    #[default]
    MyDrive,
    SharedWithMe,
    Trash,
    Saved,
}

impl ViewMode {
    /// List endpoint path, relative to the API base URL.
    pub fn list_path(&self) -> &'static str {
        match self {
            ViewMode::MyDrive => "/items",
            ViewMode::SharedWithMe => "/items/shared",
            ViewMode::Trash => "/items/trash",
            ViewMode::Saved => "/saved-items",
        }
    }

    /// Label of the synthetic root breadcrumb.
    pub fn root_label(&self) -> &'static str {
        match self {
            ViewMode::MyDrive => "My Drive",
            ViewMode::SharedWithMe => "Shared with me",
            ViewMode::Trash => "Trash",
            ViewMode::Saved => "Saved",
        }
    }
}

/// One ancestor in the server-computed breadcrumb chain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Crumb {
    pub id: ItemId,
    pub name: String,
}

/// Chunk-progress push message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadProgressMessage {
    #[serde(default)]
    pub file_name: Option<String>,
    pub progress_percent: f64,
    pub current_chunk: u32,
    pub total_chunks: u32,
}

/// A document reported in an upload completion push.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedDocument {
    #[serde(default)]
    pub id: Option<ItemId>,
    #[serde(default)]
    pub name: Option<String>,
}

/// Completion push message; `cancelled` marks a server-side cancellation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadCompletionMessage {
    #[serde(default)]
    pub documents: Vec<UploadedDocument>,
    #[serde(default)]
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PermissionLevel {
    Viewer,
    Editor,
    Owner,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Viewer => "VIEWER",
            PermissionLevel::Editor => "EDITOR",
            PermissionLevel::Owner => "OWNER",
        }
    }
}

impl std::str::FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "VIEWER" | "VIEW" => Ok(PermissionLevel::Viewer),
            "EDITOR" | "EDIT" => Ok(PermissionLevel::Editor),
            "OWNER" => Ok(PermissionLevel::Owner),
            other => Err(format!("unknown permission level: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    #[serde(default)]
    pub user_id: Option<i64>,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    pub permission: PermissionLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddPermissionRequest {
    pub item_id: ItemId,
    pub email: String,
    pub permission: PermissionLevel,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SharedLink {
    pub id: i64,
    pub item_id: ItemId,
    pub token: String,
    #[serde(default)]
    pub url: Option<String>,
    pub permission: PermissionLevel,
    #[serde(default)]
    pub expires_at: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateSharedLinkRequest {
    pub item_id: ItemId,
    pub permission: PermissionLevel,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameRequest {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateFolderRequest {
    pub name: String,
    pub parent_id: Option<ItemId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateDocumentRequest {
    pub name: String,
    /// Extension of the blank document to create (`docx`, `xlsx`, `pptx`).
    #[serde(rename = "type")]
    pub doc_type: String,
    pub folder_id: Option<ItemId>,
}
