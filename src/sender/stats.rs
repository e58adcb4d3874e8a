// Lock-free transmission statistics shared between the worker and the facade.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

#[derive(Debug, Default)]
pub struct TransmissionStats {
    posts_sent: AtomicU64,
    posts_failed: AtomicU64,
    events_sent: AtomicU64,
    bytes_sent: AtomicU64,
    total_latency_ms: AtomicU64,
    last_success_time: AtomicU64,
}

impl TransmissionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_success(&self, events: usize, bytes: usize, latency: Duration) {
        self.posts_sent.fetch_add(1, Ordering::Relaxed);
        self.events_sent.fetch_add(events as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
        self.total_latency_ms
            .fetch_add(latency.as_millis() as u64, Ordering::Relaxed);

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        self.last_success_time.store(now, Ordering::Relaxed);
    }

    pub fn record_failure(&self) {
        self.posts_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        let posts_sent = self.posts_sent.load(Ordering::Relaxed);
        let total_latency_ms = self.total_latency_ms.load(Ordering::Relaxed);

        StatsSnapshot {
            posts_sent,
            posts_failed: self.posts_failed.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            average_latency_ms: if posts_sent > 0 {
                total_latency_ms / posts_sent
            } else {
                0
            },
            last_success_time: self.last_success_time.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub posts_sent: u64,
    pub posts_failed: u64,
    pub events_sent: u64,
    pub bytes_sent: u64,
    pub average_latency_ms: u64,
    /// Unix seconds, 0 if nothing was ever sent.
    pub last_success_time: u64,
}
