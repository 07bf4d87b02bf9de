//! Process-wide pipeline counters.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Monotonic counters updated by the consumer loop and dispatch tasks.
#[derive(Debug, Default)]
pub struct PipelineStats {
    events_consumed: AtomicU64,
    events_dropped: AtomicU64,
    passes_aborted: AtomicU64,
    subscribers_visited: AtomicU64,
    alerts_published: AtomicU64,
    alerts_lost: AtomicU64,
    read_errors: AtomicU64,
}

/// Point-in-time copy of [`PipelineStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatsSnapshot {
    pub events_consumed: u64,
    pub events_dropped: u64,
    pub passes_aborted: u64,
    pub subscribers_visited: u64,
    pub alerts_published: u64,
    pub alerts_lost: u64,
    pub read_errors: u64,
}

impl PipelineStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_consumed(&self) {
        self.events_consumed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped(&self) {
        self.events_dropped.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_aborted(&self) {
        self.passes_aborted.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_visited(&self, count: u64) {
        self.subscribers_visited.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_published(&self) {
        self.alerts_published.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_lost(&self) {
        self.alerts_lost.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_read_error(&self) {
        self.read_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            events_consumed: self.events_consumed.load(Ordering::Relaxed),
            events_dropped: self.events_dropped.load(Ordering::Relaxed),
            passes_aborted: self.passes_aborted.load(Ordering::Relaxed),
            subscribers_visited: self.subscribers_visited.load(Ordering::Relaxed),
            alerts_published: self.alerts_published.load(Ordering::Relaxed),
            alerts_lost: self.alerts_lost.load(Ordering::Relaxed),
            read_errors: self.read_errors.load(Ordering::Relaxed),
        }
    }
}
