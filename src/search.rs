//! Debounced free-text search over document metadata.
//!
//! Keystrokes restart the debounce window; only the settled keyword goes to
//! the backend. Every keystroke also bumps a sequence number and cancels the
//! request in flight, so a response can only be published while its keyword
//! is still the latest input.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, watch};
use tokio::time::{sleep_until, Instant};
use tokio_util::sync::CancellationToken;

use crate::api::ItemBackend;
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::types::Item;

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    /// Debounce settled, request in flight.
    Searching { keyword: String },
    Results { keyword: String, items: Vec<Item>, total: u64 },
    Failed { keyword: String, message: String },
}

#[derive(Debug, Clone)]
pub struct SearchSettings {
    pub debounce: Duration,
    pub page_size: u32,
}

/// Handle to a running search task. Dropping it stops the task.
pub struct SearchBox {
    input: mpsc::UnboundedSender<String>,
    state: watch::Receiver<SearchState>,
    shutdown: CancellationToken,
}

impl SearchBox {
    pub fn spawn(
        backend: Arc<dyn ItemBackend>,
        settings: SearchSettings,
        notifier: Notifier,
        metrics: Metrics,
    ) -> Self {
        let (input, input_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(SearchState::Idle);
        let shutdown = CancellationToken::new();
        let worker = SearchWorker {
            backend,
            settings,
            notifier,
            metrics,
            state: Arc::new(state_tx),
            latest: Arc::new(AtomicU64::new(0)),
            shutdown: shutdown.clone(),
        };
        tokio::spawn(worker.run(input_rx));
        Self { input, state, shutdown }
    }

    /// Feeds the current content of the search field.
    pub fn input(&self, keyword: impl Into<String>) {
        let _ = self.input.send(keyword.into());
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchState> {
        self.state.clone()
    }

    pub fn current(&self) -> SearchState {
        self.state.borrow().clone()
    }

    pub fn close(&self) {
        self.shutdown.cancel();
    }
}

impl Drop for SearchBox {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

struct SearchWorker {
    backend: Arc<dyn ItemBackend>,
    settings: SearchSettings,
    notifier: Notifier,
    metrics: Metrics,
    state: Arc<watch::Sender<SearchState>>,
    latest: Arc<AtomicU64>,
    shutdown: CancellationToken,
}

impl SearchWorker {
    async fn run(self, mut input_rx: mpsc::UnboundedReceiver<String>) {
        let mut pending: Option<(String, Instant)> = None;
        let mut in_flight: Option<CancellationToken> = None;

        loop {
            let deadline = pending.as_ref().map(|(_, at)| *at);
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                keyword = input_rx.recv() => {
                    let Some(keyword) = keyword else { break };
                    self.latest.fetch_add(1, Ordering::SeqCst);
                    if let Some(token) = in_flight.take() {
                        token.cancel();
                    }
                    let keyword = keyword.trim().to_string();
                    if keyword.is_empty() {
                        pending = None;
                        self.state.send_replace(SearchState::Idle);
                    } else {
                        pending = Some((keyword, Instant::now() + self.settings.debounce));
                    }
                }
                _ = wait_until(deadline) => {
                    if let Some((keyword, _)) = pending.take() {
                        in_flight = Some(self.fire(keyword));
                    }
                }
            }
        }
        if let Some(token) = in_flight {
            token.cancel();
        }
        tracing::debug!("search task stopped");
    }

    fn fire(&self, keyword: String) -> CancellationToken {
        let seq = self.latest.load(Ordering::SeqCst);
        let token = self.shutdown.child_token();
        self.state.send_replace(SearchState::Searching { keyword: keyword.clone() });
        tracing::debug!(%keyword, seq, "search");

        let backend = self.backend.clone();
        let state = self.state.clone();
        let latest = self.latest.clone();
        let notifier = self.notifier.clone();
        let metrics = self.metrics.clone();
        let size = self.settings.page_size;
        let cancel = token.clone();
        tokio::spawn(async move {
            let result = tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::debug!(%keyword, "search superseded");
                    return;
                }
                result = backend.search_documents(&keyword, 0, size) => result,
            };
            if latest.load(Ordering::SeqCst) != seq {
                metrics.inc_stale_dropped();
                tracing::warn!(%keyword, "discarding stale search response");
                return;
            }
            let next = match result {
                Ok(page) => SearchState::Results { keyword, total: page.total_items, items: page.items },
                Err(e) => {
                    notifier.error(format!("Search failed: {}", e.user_message()));
                    SearchState::Failed { keyword, message: e.user_message() }
                }
            };
            state.send_replace(next);
        });
        token
    }
}

async fn wait_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => sleep_until(at).await,
        None => std::future::pending().await,
    }
}
