// In-memory JobStore Implementation

use async_trait::async_trait;
use jobengine_core::domain::{DeadLetterEntry, DispatchKey, QueueStats, QueuedEntry};
use jobengine_core::error::Result;
use jobengine_core::port::JobStore;
use std::collections::BTreeMap;
use tokio::sync::Mutex;
use tracing::trace;

#[derive(Default)]
struct Inner {
    /// Live queue in dispatch order. The trailing counter keeps keys unique
    /// even if two queues share a store and hand out equal sequences.
    live: BTreeMap<(DispatchKey, u64), QueuedEntry>,
    dead: Vec<DeadLetterEntry>,
    inserted: u64,
}

/// Process-memory store. State is lost on restart.
#[derive(Default)]
pub struct MemoryJobStore {
    inner: Mutex<Inner>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn push(&self, entry: QueuedEntry) -> Result<()> {
        let mut inner = self.inner.lock().await;
        let slot = inner.inserted;
        inner.inserted += 1;
        inner.live.insert((entry.dispatch_key(), slot), entry);
        Ok(())
    }

    async fn claim_next(&self, now_millis: i64) -> Result<Option<QueuedEntry>> {
        let mut inner = self.inner.lock().await;

        // Walk in dispatch order; not-yet-eligible entries are skipped, not waited on
        let key = inner
            .live
            .iter()
            .find(|(_, entry)| entry.is_eligible(now_millis))
            .map(|(key, _)| *key);

        let claimed = key.and_then(|key| inner.live.remove(&key));
        if let Some(entry) = &claimed {
            trace!(
                job_id = %entry.job().id(),
                remaining = inner.live.len(),
                "Claimed entry"
            );
        }
        Ok(claimed)
    }

    async fn bury(&self, dead: DeadLetterEntry) -> Result<()> {
        self.inner.lock().await.dead.push(dead);
        Ok(())
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetterEntry>> {
        Ok(self.inner.lock().await.dead.clone())
    }

    async fn take_dead_letter(&self, job_id: &str) -> Result<Option<DeadLetterEntry>> {
        let mut inner = self.inner.lock().await;
        let position = inner.dead.iter().position(|dead| dead.job().id() == job_id);
        Ok(position.map(|index| inner.dead.remove(index)))
    }

    async fn stats(&self) -> Result<QueueStats> {
        let inner = self.inner.lock().await;
        Ok(QueueStats {
            pending: inner.live.len(),
            dead: inner.dead.len(),
        })
    }
}
