//! Embedded office editor configuration.
//!
//! The backend computes the full config (document key, signed URLs, callback);
//! the client only fetches it for documents and checks it before handing it
//! to the editor.

use serde::{Deserialize, Serialize};

use crate::api::{documents, ApiClient};
use crate::error::{ClientError, ClientResult};
use crate::types::{Item, ItemKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorDocument {
    pub file_type: String,
    pub key: String,
    pub title: String,
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorUser {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EditorMode {
    Edit,
    View,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    pub mode: EditorMode,
    pub user: EditorUser,
    pub callback_url: String,
    #[serde(default)]
    pub customization: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorConfig {
    pub document: EditorDocument,
    pub document_type: String,
    pub editor_config: EditorSettings,
    /// Signed JWT, when the document server requires one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

impl EditorConfig {
    /// Rejects configs the editor cannot load.
    pub fn validate(&self) -> ClientResult<()> {
        if self.document.key.is_empty() {
            return Err(ClientError::Decode("editor config has an empty document key".into()));
        }
        for (field, value) in [("document.url", &self.document.url), ("callbackUrl", &self.editor_config.callback_url)] {
            url::Url::parse(value).map_err(|e| ClientError::Decode(format!("editor config {}: {}", field, e)))?;
        }
        let expected = document_type_for(&self.document.file_type);
        if expected.map(|t| t != self.document_type).unwrap_or(false) {
            tracing::warn!(
                file_type = %self.document.file_type,
                document_type = %self.document_type,
                "editor document type does not match file type"
            );
        }
        Ok(())
    }
}

/// Editor family for a file extension.
pub fn document_type_for(file_type: &str) -> Option<&'static str> {
    match file_type.to_ascii_lowercase().as_str() {
        "doc" | "docx" | "odt" | "rtf" | "txt" => Some("word"),
        "xls" | "xlsx" | "ods" | "csv" => Some("cell"),
        "ppt" | "pptx" | "odp" => Some("slide"),
        "pdf" => Some("pdf"),
        _ => None,
    }
}

/// Fetches the editor config for a document. Folders cannot be opened.
pub async fn open(api: &ApiClient, item: &Item) -> ClientResult<EditorConfig> {
    match &item.kind {
        ItemKind::Document { .. } => {
            let cfg = documents::editor_config(api, item.id).await?;
            cfg.validate()?;
            Ok(cfg)
        }
        ItemKind::Folder => Err(ClientError::InvalidInput(format!("'{}' is a folder", item.name))),
    }
}
