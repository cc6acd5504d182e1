//! Explicit session state.
//!
//! Tokens and cached profile fields live in a [`SessionStore`] that is handed
//! to the API client and the push client at construction. Login installs a
//! session, logout tears it down; nothing reads tokens from ambient globals.

use std::path::Path;
use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ClientError, ClientResult};

/// Cached fields of the logged-in user.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Profile {
    pub user_id: Option<i64>,
    pub email: String,
    pub name: Option<String>,
    pub avatar: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub profile: Option<Profile>,
    pub logged_in_at: DateTime<Utc>,
}

impl Session {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
            profile: None,
            logged_in_at: Utc::now(),
        }
    }

    pub fn with_profile(mut self, profile: Profile) -> Self {
        self.profile = Some(profile);
        self
    }

    /// Reads a persisted session. A missing file is not an error.
    pub fn load(path: &Path) -> ClientResult<Option<Session>> {
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(Some(serde_json::from_str(&text)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    pub fn save(&self, path: &Path) -> ClientResult<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        Ok(())
    }

    pub fn remove(path: &Path) -> ClientResult<()> {
        match std::fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Shared handle to the current session, if any.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    inner: Arc<RwLock<Option<Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_session(session: Session) -> Self {
        let store = Self::new();
        store.login(session);
        store
    }

    pub fn login(&self, session: Session) {
        tracing::info!(
            email = session.profile.as_ref().map(|p| p.email.as_str()).unwrap_or("-"),
            "session started"
        );
        *self.write() = Some(session);
    }

    /// Tears the session down and returns what was installed.
    pub fn logout(&self) -> Option<Session> {
        let previous = self.write().take();
        if previous.is_some() {
            tracing::info!("session ended");
        }
        previous
    }

    /// Ends the session when `err` says the backend no longer accepts it.
    /// Returns whether a session was torn down.
    pub fn end_if_rejected(&self, err: &ClientError) -> bool {
        if !err.is_auth() {
            return false;
        }
        self.logout().is_some()
    }

    pub fn is_logged_in(&self) -> bool {
        self.read().is_some()
    }

    pub fn current(&self) -> Option<Session> {
        self.read().clone()
    }

    /// The access token to attach as `Authorization: Bearer ..`.
    pub fn bearer(&self) -> ClientResult<String> {
        self.read()
            .as_ref()
            .map(|s| s.access_token.clone())
            .ok_or(ClientError::NotLoggedIn)
    }

    pub fn profile(&self) -> Option<Profile> {
        self.read().as_ref().and_then(|s| s.profile.clone())
    }

    pub fn set_profile(&self, profile: Profile) {
        if let Some(session) = self.write().as_mut() {
            session.profile = Some(profile);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Option<Session>> {
        // A poisoned lock only means a panic elsewhere; the Option is still valid.
        self.inner.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, Option<Session>> {
        self.inner.write().unwrap_or_else(|e| e.into_inner())
    }
}
