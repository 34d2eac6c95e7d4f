// Queue entries and dispatch ordering

use serde::{Deserialize, Serialize};
use std::cmp::Reverse;

use crate::domain::{Job, RetryPolicy};

/// Live-queue ordering: priority weight descending, then `available_at`
/// ascending, then insertion sequence ascending.
///
/// Field order matters: the derived `Ord` is lexicographic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DispatchKey {
    priority: Reverse<u8>,
    available_at: i64,
    sequence: u64,
}

/// A job waiting in the live queue
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedEntry {
    pub(crate) job: Job,
    pub(crate) retry_policy: RetryPolicy,
    /// Earliest dispatch time (epoch ms)
    pub(crate) available_at: i64,
    pub(crate) sequence: u64,
}

impl QueuedEntry {
    pub fn new(job: Job, retry_policy: RetryPolicy, available_at: i64, sequence: u64) -> Self {
        Self {
            job,
            retry_policy,
            available_at,
            sequence,
        }
    }

    pub fn job(&self) -> &Job {
        &self.job
    }

    pub fn into_job(self) -> Job {
        self.job
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry_policy
    }

    pub fn is_eligible(&self, now_millis: i64) -> bool {
        self.available_at <= now_millis
    }

    pub fn dispatch_key(&self) -> DispatchKey {
        DispatchKey {
            priority: Reverse(self.job.priority().weight()),
            available_at: self.available_at,
            sequence: self.sequence,
        }
    }
}

/// A queued entry that exhausted its retry budget
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeadLetterEntry {
    pub entry: QueuedEntry,
    pub last_error: String,
    /// When the entry was moved out of the live queue (epoch ms)
    pub dead_at: i64,
}

impl DeadLetterEntry {
    pub fn job(&self) -> &Job {
        self.entry.job()
    }
}

/// Queue counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStats {
    pub pending: usize,
    pub dead: usize,
}
