//! Transient user notifications (toasts).
//!
//! State modules publish here; a front end subscribes and renders. Sending
//! with no subscriber attached is fine, the toast is just dropped.

use tokio::sync::broadcast;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    pub level: ToastLevel,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct Notifier {
    sender: broadcast::Sender<Toast>,
}

impl Notifier {
    pub fn new() -> Self {
        let (sender, _rx) = broadcast::channel(64);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Toast> {
        self.sender.subscribe()
    }

    pub fn show(&self, level: ToastLevel, message: impl Into<String>) {
        let toast = Toast { level, message: message.into() };
        tracing::debug!(level = ?toast.level, message = %toast.message, "toast");
        let _ = self.sender.send(toast);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(ToastLevel::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(ToastLevel::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.show(ToastLevel::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(ToastLevel::Error, message);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}
