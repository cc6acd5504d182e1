//! Server push over STOMP.
//!
//! [`PushSource`] is the seam the upload orchestrator subscribes through;
//! [`PushClient`] implements it on a long-lived WebSocket connection.

mod client;
pub mod frame;

pub use client::PushClient;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::mpsc;

use crate::error::{ClientError, ClientResult};

/// A live subscription to one destination.
///
/// Message bodies arrive in order. Dropping the subscription unsubscribes.
pub struct Subscription {
    destination: String,
    rx: mpsc::UnboundedReceiver<String>,
    on_drop: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(
        destination: impl Into<String>,
        rx: mpsc::UnboundedReceiver<String>,
        on_drop: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self { destination: destination.into(), rx, on_drop: Some(Box::new(on_drop)) }
    }

    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Next raw message body; `None` once the channel is gone.
    pub async fn recv(&mut self) -> Option<String> {
        self.rx.recv().await
    }

    /// Next message body decoded as JSON.
    pub async fn recv_json<T: DeserializeOwned>(&mut self) -> Option<ClientResult<T>> {
        let body = self.rx.recv().await?;
        Some(serde_json::from_str(&body).map_err(|e| {
            ClientError::Decode(format!("push message on {}: {}", self.destination, e))
        }))
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(f) = self.on_drop.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("destination", &self.destination).finish()
    }
}

#[async_trait]
pub trait PushSource: Send + Sync {
    async fn subscribe(&self, destination: &str) -> ClientResult<Subscription>;
}
