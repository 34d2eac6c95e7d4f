// Job Store Port (Interface)
//
// Storage contract for the live queue and the dead-letter store. Ordering is
// defined by `QueuedEntry::dispatch_key`; retry and backoff decisions stay in
// the application layer so every backend behaves the same.

use crate::domain::{DeadLetterEntry, QueueStats, QueuedEntry};
use crate::error::Result;
use async_trait::async_trait;

/// Repository interface for queued and dead-lettered jobs
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Insert an entry into the live queue
    async fn push(&self, entry: QueuedEntry) -> Result<()>;

    /// Claim and remove the first entry in dispatch order with
    /// `available_at <= now_millis`.
    ///
    /// Must be atomic: an entry is handed to at most one caller. Entries that
    /// are not yet eligible are skipped, never returned and never blocking.
    async fn claim_next(&self, now_millis: i64) -> Result<Option<QueuedEntry>>;

    /// Append to the dead-letter store
    async fn bury(&self, dead: DeadLetterEntry) -> Result<()>;

    /// Snapshot of the dead-letter store in burial order
    async fn dead_letters(&self) -> Result<Vec<DeadLetterEntry>>;

    /// Remove a dead-letter entry by job ID (operator replay)
    async fn take_dead_letter(&self, job_id: &str) -> Result<Option<DeadLetterEntry>>;

    /// Count live and dead entries
    async fn stats(&self) -> Result<QueueStats>;
}
