// Worker statistics
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Lifetime counters for one worker pool. Cheap to clone; clones share counters.
#[derive(Debug, Clone, Default)]
pub struct WorkerStats {
    dispatched: Arc<AtomicU64>,
    succeeded: Arc<AtomicU64>,
    failed: Arc<AtomicU64>,
    retried: Arc<AtomicU64>,
    dead_lettered: Arc<AtomicU64>,
    unroutable: Arc<AtomicU64>,
}

/// Point-in-time copy of [`WorkerStats`] plus the live dispatch count
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerStatsSnapshot {
    pub dispatched: u64,
    pub succeeded: u64,
    pub failed: u64,
    pub retried: u64,
    pub dead_lettered: u64,
    pub unroutable: u64,
    pub active: usize,
}

impl WorkerStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_dispatched(&self) {
        self.dispatched.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_succeeded(&self) {
        self.succeeded.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_failed(&self) {
        self.failed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_retried(&self) {
        self.retried.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_dead_lettered(&self) {
        self.dead_lettered.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_unroutable(&self) {
        self.unroutable.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self, active: usize) -> WorkerStatsSnapshot {
        WorkerStatsSnapshot {
            dispatched: self.dispatched.load(Ordering::Relaxed),
            succeeded: self.succeeded.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            retried: self.retried.load(Ordering::Relaxed),
            dead_lettered: self.dead_lettered.load(Ordering::Relaxed),
            unroutable: self.unroutable.load(Ordering::Relaxed),
            active,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_worker_stats() {
        let stats = WorkerStats::new();
        assert_eq!(stats.snapshot(0), WorkerStatsSnapshot::default());

        let shared = stats.clone();
        shared.record_dispatched();
        shared.record_failed();
        shared.record_retried();

        let snapshot = stats.snapshot(2);
        assert_eq!(snapshot.dispatched, 1);
        assert_eq!(snapshot.failed, 1);
        assert_eq!(snapshot.retried, 1);
        assert_eq!(snapshot.succeeded, 0);
        assert_eq!(snapshot.active, 2);
    }
}
