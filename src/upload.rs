//! Upload orchestration with live progress from the push channel.
//!
//! ```text
//! Idle -> Uploading -> Completed | Cancelled -> (grace period) -> Idle
//!                   -> Failed -> Idle
//! ```
//!
//! Only one upload is tracked at a time. Both push channels are subscribed
//! before the upload request goes out so an early completion is not missed.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::api::{UploadBackend, UploadFile};
use crate::error::{ClientError, ClientResult};
use crate::metrics::Metrics;
use crate::notify::Notifier;
use crate::push::{PushSource, Subscription};
use crate::types::{ItemId, UploadCompletionMessage, UploadProgressMessage};

/// Progress of the tracked upload, as last reported by the server.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadProgress {
    pub file_name: String,
    pub percent: f64,
    pub current_chunk: u32,
    pub total_chunks: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Idle,
    Uploading(Uuid),
    Completed(Uuid),
    Cancelled(Uuid),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadOutcome {
    Completed { documents: usize },
    Cancelled,
}

/// The upload state machine, free of I/O.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTracker {
    phase: UploadPhase,
    progress: Option<UploadProgress>,
}

impl Default for UploadTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl UploadTracker {
    pub fn new() -> Self {
        Self { phase: UploadPhase::Idle, progress: None }
    }

    pub fn phase(&self) -> UploadPhase {
        self.phase
    }

    pub fn progress(&self) -> Option<&UploadProgress> {
        self.progress.as_ref()
    }

    pub fn is_uploading(&self) -> bool {
        matches!(self.phase, UploadPhase::Uploading(_))
    }

    /// Starts tracking `id`. A finished upload still in its grace period is
    /// replaced; a running one is not.
    pub fn begin(&mut self, id: Uuid, first_file: &str) -> ClientResult<()> {
        if self.is_uploading() {
            return Err(ClientError::UploadInProgress);
        }
        self.phase = UploadPhase::Uploading(id);
        self.progress = Some(UploadProgress {
            file_name: first_file.to_string(),
            percent: 0.0,
            current_chunk: 0,
            total_chunks: 0,
        });
        Ok(())
    }

    /// Overwrites the progress record. Ignored unless uploading.
    pub fn on_progress(&mut self, msg: &UploadProgressMessage) -> bool {
        if !self.is_uploading() {
            return false;
        }
        let file_name = msg
            .file_name
            .clone()
            .or_else(|| self.progress.as_ref().map(|p| p.file_name.clone()))
            .unwrap_or_default();
        self.progress = Some(UploadProgress {
            file_name,
            percent: msg.progress_percent,
            current_chunk: msg.current_chunk,
            total_chunks: msg.total_chunks,
        });
        true
    }

    pub fn on_completion(&mut self, msg: &UploadCompletionMessage) -> Option<(Uuid, UploadOutcome)> {
        let UploadPhase::Uploading(id) = self.phase else {
            return None;
        };
        if msg.cancelled {
            self.phase = UploadPhase::Cancelled(id);
            Some((id, UploadOutcome::Cancelled))
        } else {
            self.phase = UploadPhase::Completed(id);
            Some((id, UploadOutcome::Completed { documents: msg.documents.len() }))
        }
    }

    /// The user's cancel call succeeded.
    pub fn cancel_confirmed(&mut self, id: Uuid) -> bool {
        if self.phase != UploadPhase::Uploading(id) {
            return false;
        }
        self.phase = UploadPhase::Cancelled(id);
        true
    }

    /// The upload request itself failed: straight back to idle.
    pub fn fail(&mut self, id: Uuid) -> bool {
        if self.phase != UploadPhase::Uploading(id) {
            return false;
        }
        self.phase = UploadPhase::Idle;
        self.progress = None;
        true
    }

    /// End of the grace period of a finished upload.
    pub fn clear(&mut self, id: Uuid) -> bool {
        match self.phase {
            UploadPhase::Completed(done) | UploadPhase::Cancelled(done) if done == id => {
                self.phase = UploadPhase::Idle;
                self.progress = None;
                true
            }
            _ => false,
        }
    }
}

/// What a progress indicator renders.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadView {
    pub phase: UploadPhase,
    pub progress: Option<UploadProgress>,
}

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub progress_topic: String,
    pub completion_topic: String,
    pub grace_period: Duration,
}

struct Shared {
    tracker: Mutex<UploadTracker>,
    view: watch::Sender<UploadView>,
    notifier: Notifier,
    metrics: Metrics,
    grace_period: Duration,
}

impl Shared {
    fn publish(&self, tracker: &UploadTracker) {
        self.view.send_replace(UploadView { phase: tracker.phase(), progress: tracker.progress().cloned() });
    }

    async fn progress(&self, id: Uuid, msg: &UploadProgressMessage) {
        let mut tracker = self.tracker.lock().await;
        if tracker.phase() != UploadPhase::Uploading(id) {
            return;
        }
        if tracker.on_progress(msg) {
            tracing::debug!(
                percent = msg.progress_percent,
                chunk = msg.current_chunk,
                total = msg.total_chunks,
                "upload progress"
            );
            self.publish(&tracker);
        }
    }

    async fn completed(self: &Arc<Self>, id: Uuid, msg: &UploadCompletionMessage) {
        let outcome = {
            let mut tracker = self.tracker.lock().await;
            if tracker.phase() != UploadPhase::Uploading(id) {
                return;
            }
            let outcome = tracker.on_completion(msg);
            self.publish(&tracker);
            outcome
        };
        match outcome {
            Some((_, UploadOutcome::Completed { documents })) => {
                self.metrics.inc_uploads_completed();
                tracing::info!(%id, documents, "upload completed");
                self.notifier.success(format!("Uploaded {} file(s)", documents));
            }
            Some((_, UploadOutcome::Cancelled)) => {
                self.metrics.inc_uploads_cancelled();
                tracing::info!(%id, "upload cancelled by server");
                self.notifier.warning("Upload cancelled");
            }
            None => return,
        }
        self.clear_after_grace(id);
    }

    async fn cancelled(self: &Arc<Self>, id: Uuid) {
        let confirmed = {
            let mut tracker = self.tracker.lock().await;
            let confirmed = tracker.cancel_confirmed(id);
            if confirmed {
                self.publish(&tracker);
            }
            confirmed
        };
        if confirmed {
            self.metrics.inc_uploads_cancelled();
            tracing::info!(%id, "upload cancelled");
            self.notifier.warning("Upload cancelled");
            self.clear_after_grace(id);
        }
    }

    async fn failed(&self, id: Uuid, err: &ClientError) {
        let mut tracker = self.tracker.lock().await;
        if tracker.fail(id) {
            self.publish(&tracker);
            self.metrics.inc_uploads_failed();
            tracing::error!(%id, "upload failed: {}", err);
            self.notifier.error(format!("Upload failed: {}", err.user_message()));
        }
    }

    /// A push channel closed while the upload was running; its outcome can no
    /// longer be observed.
    async fn channel_closed(&self, id: Uuid, channel: &str) {
        tracing::warn!(%id, channel, "push channel closed during upload");
        let err = ClientError::Push(format!("{} channel closed before the upload finished", channel));
        self.failed(id, &err).await;
    }

    fn clear_after_grace(self: &Arc<Self>, id: Uuid) {
        let shared = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(shared.grace_period).await;
            let mut tracker = shared.tracker.lock().await;
            if tracker.clear(id) {
                shared.publish(&tracker);
            }
        });
    }
}

pub struct UploadOrchestrator {
    backend: Arc<dyn UploadBackend>,
    push: Arc<dyn PushSource>,
    progress_topic: String,
    completion_topic: String,
    shared: Arc<Shared>,
    listener: Mutex<Option<CancellationToken>>,
}

impl UploadOrchestrator {
    pub fn new(
        backend: Arc<dyn UploadBackend>,
        push: Arc<dyn PushSource>,
        settings: UploadSettings,
        notifier: Notifier,
        metrics: Metrics,
    ) -> Self {
        let (view, _rx) = watch::channel(UploadView { phase: UploadPhase::Idle, progress: None });
        Self {
            backend,
            push,
            progress_topic: settings.progress_topic,
            completion_topic: settings.completion_topic,
            shared: Arc::new(Shared {
                tracker: Mutex::new(UploadTracker::new()),
                view,
                notifier,
                metrics,
                grace_period: settings.grace_period,
            }),
            listener: Mutex::new(None),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<UploadView> {
        self.shared.view.subscribe()
    }

    pub fn view(&self) -> UploadView {
        self.shared.view.borrow().clone()
    }

    /// Uploads `files` into `folder` (`None` = root). Resolves when the
    /// upload request returns; progress and completion keep arriving on
    /// [`subscribe`](Self::subscribe).
    pub async fn start(&self, folder: Option<ItemId>, files: Vec<UploadFile>) -> ClientResult<Uuid> {
        let Some(first) = files.first() else {
            return Err(ClientError::InvalidInput("no files to upload".into()));
        };
        let id = Uuid::new_v4();
        {
            let mut tracker = self.shared.tracker.lock().await;
            if let Err(e) = tracker.begin(id, &first.name) {
                self.shared.notifier.warning("An upload is already in progress");
                return Err(e);
            }
            self.shared.publish(&tracker);
        }
        self.shared.metrics.inc_uploads_started();
        tracing::info!(%id, files = files.len(), ?folder, "upload started");

        let (progress, completion) = match self.open_channels().await {
            Ok(subs) => subs,
            Err(e) => {
                self.shared.failed(id, &e).await;
                return Err(e);
            }
        };
        let stop = CancellationToken::new();
        if let Some(previous) = self.listener.lock().await.replace(stop.clone()) {
            previous.cancel();
        }
        tokio::spawn(listen(self.shared.clone(), id, progress, completion, stop.clone()));

        match self.backend.upload_files(folder, id, files).await {
            Ok(()) => Ok(id),
            Err(e) => {
                stop.cancel();
                self.shared.failed(id, &e).await;
                Err(e)
            }
        }
    }

    async fn open_channels(&self) -> ClientResult<(Subscription, Subscription)> {
        let progress = self.push.subscribe(&self.progress_topic).await?;
        let completion = self.push.subscribe(&self.completion_topic).await?;
        Ok((progress, completion))
    }

    /// Cancels the running upload, if any. Returns whether one was cancelled.
    pub async fn cancel(&self) -> ClientResult<bool> {
        let UploadPhase::Uploading(id) = self.shared.tracker.lock().await.phase() else {
            return Ok(false);
        };
        if let Err(e) = self.backend.cancel_upload(id).await {
            tracing::error!(%id, "cancel failed: {}", e);
            self.shared.notifier.error(format!("Could not cancel upload: {}", e.user_message()));
            return Err(e);
        }
        if let Some(stop) = self.listener.lock().await.take() {
            stop.cancel();
        }
        self.shared.cancelled(id).await;
        Ok(true)
    }

    /// Waits until the tracker is back to idle.
    pub async fn wait_idle(&self) {
        let mut rx = self.subscribe();
        let _ = rx.wait_for(|v| v.phase == UploadPhase::Idle).await;
    }
}

/// Consumes both push channels until the upload finishes or is stopped.
/// Returning drops the subscriptions, which unsubscribes them.
async fn listen(
    shared: Arc<Shared>,
    id: Uuid,
    mut progress: Subscription,
    mut completion: Subscription,
    stop: CancellationToken,
) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => return,
            msg = progress.recv_json::<UploadProgressMessage>() => match msg {
                Some(Ok(msg)) => shared.progress(id, &msg).await,
                Some(Err(e)) => tracing::warn!("bad progress message: {}", e),
                None => {
                    drop(progress);
                    drop(completion);
                    shared.channel_closed(id, "progress").await;
                    return;
                }
            },
            msg = completion.recv_json::<UploadCompletionMessage>() => match msg {
                Some(Ok(msg)) => {
                    drop(progress);
                    drop(completion);
                    shared.completed(id, &msg).await;
                    return;
                }
                Some(Err(e)) => tracing::warn!("bad completion message: {}", e),
                None => {
                    drop(progress);
                    drop(completion);
                    shared.channel_closed(id, "completion").await;
                    return;
                }
            },
        }
    }
}
