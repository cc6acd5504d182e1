use serde::Serialize;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Client-side counters
#[derive(Clone)]
pub struct Metrics {
    pub requests_sent: Arc<AtomicU64>,
    pub requests_failed: Arc<AtomicU64>,
    pub stale_responses_dropped: Arc<AtomicU64>,
    pub uploads_started: Arc<AtomicUsize>,
    pub uploads_completed: Arc<AtomicUsize>,
    pub uploads_cancelled: Arc<AtomicUsize>,
    pub uploads_failed: Arc<AtomicUsize>,
    pub start_time: Instant,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            requests_sent: Arc::new(AtomicU64::new(0)),
            requests_failed: Arc::new(AtomicU64::new(0)),
            stale_responses_dropped: Arc::new(AtomicU64::new(0)),
            uploads_started: Arc::new(AtomicUsize::new(0)),
            uploads_completed: Arc::new(AtomicUsize::new(0)),
            uploads_cancelled: Arc::new(AtomicUsize::new(0)),
            uploads_failed: Arc::new(AtomicUsize::new(0)),
            start_time: Instant::now(),
        }
    }

    pub fn inc_requests_sent(&self) {
        self.requests_sent.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_requests_failed(&self) {
        self.requests_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_stale_dropped(&self) {
        self.stale_responses_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uploads_started(&self) {
        self.uploads_started.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uploads_completed(&self) {
        self.uploads_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uploads_cancelled(&self) {
        self.uploads_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_uploads_failed(&self) {
        self.uploads_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            requests_sent: self.requests_sent.load(Ordering::Relaxed),
            requests_failed: self.requests_failed.load(Ordering::Relaxed),
            stale_responses_dropped: self.stale_responses_dropped.load(Ordering::Relaxed),
            uploads_started: self.uploads_started.load(Ordering::Relaxed),
            uploads_completed: self.uploads_completed.load(Ordering::Relaxed),
            uploads_cancelled: self.uploads_cancelled.load(Ordering::Relaxed),
            uploads_failed: self.uploads_failed.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsSnapshot {
    pub requests_sent: u64,
    pub requests_failed: u64,
    pub stale_responses_dropped: u64,
    pub uploads_started: usize,
    pub uploads_completed: usize,
    pub uploads_cancelled: usize,
    pub uploads_failed: usize,
    pub uptime_seconds: u64,
}
