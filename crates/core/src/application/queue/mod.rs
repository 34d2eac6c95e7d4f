// Job Queue - ordered live queue plus dead-letter store

pub mod enqueue;
mod enqueue_test;

pub use enqueue::{validate_request, EnqueueAck, EnqueueOptions, EnqueueRequest};

use crate::application::retry::{self, RetryDecision};
use crate::domain::{DeadLetterEntry, Job, JobSpec, QueueStats, QueuedEntry};
use crate::error::{AppError, Result};
use crate::port::{IdProvider, JobStore, TimeProvider};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{debug, error, info, warn};

/// Job queue service
///
/// Owns ordering, retry and dead-letter decisions; the [`JobStore`] only keeps
/// entries. All job state changes go through this type.
pub struct JobQueue {
    store: Arc<dyn JobStore>,
    id_provider: Arc<dyn IdProvider>,
    time_provider: Arc<dyn TimeProvider>,
    sequence: AtomicU64,
    ready: Notify,
}

impl JobQueue {
    pub fn new(
        store: Arc<dyn JobStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            store,
            id_provider,
            time_provider,
            sequence: AtomicU64::new(0),
            ready: Notify::new(),
        }
    }

    /// Accept a job. Execution happens later on the worker pool.
    pub async fn enqueue(&self, spec: JobSpec, options: EnqueueOptions) -> Result<EnqueueAck> {
        let ack = enqueue::execute(
            self.store.as_ref(),
            self.id_provider.as_ref(),
            self.time_provider.as_ref(),
            self.next_sequence(),
            spec,
            options,
        )
        .await?;
        self.ready.notify_one();
        Ok(ack)
    }

    /// Claim the highest-priority eligible entry, if any.
    ///
    /// Entries whose `available_at` lies in the future are skipped regardless
    /// of their priority. The claimed entry leaves the live queue.
    pub async fn dequeue(&self) -> Result<Option<QueuedEntry>> {
        let now = self.time_provider.now_millis();
        let claimed = self.store.claim_next(now).await?;
        if let Some(entry) = &claimed {
            debug!(
                job_id = %entry.job().id(),
                job_name = %entry.job().name(),
                attempts = entry.job().attempts(),
                "Dequeued job"
            );
        }
        Ok(claimed)
    }

    /// Record a failed execution: re-insert with backoff, or dead-letter once
    /// the retry budget is used up.
    pub async fn retry(&self, mut entry: QueuedEntry, error: &str) -> Result<RetryDecision> {
        let attempt = entry.job.record_failure();
        let now = self.time_provider.now_millis();
        let decision = retry::decide(&entry.retry_policy, attempt, now);

        let job_id = entry.job().id().to_string();
        let job_name = entry.job().name().to_string();

        match decision {
            RetryDecision::DeadLettered { attempts } => {
                self.store
                    .bury(DeadLetterEntry {
                        entry,
                        last_error: error.to_string(),
                        dead_at: now,
                    })
                    .await?;
                error!(
                    job_id = %job_id,
                    job_name = %job_name,
                    attempts = attempts,
                    error = %error,
                    "Job exhausted retries; moved to dead-letter store"
                );
            }
            RetryDecision::Retry {
                attempt,
                delay_ms,
                available_at,
            } => {
                entry.available_at = available_at;
                entry.sequence = self.next_sequence();
                self.store.push(entry).await?;
                self.ready.notify_one();
                warn!(
                    job_id = %job_id,
                    job_name = %job_name,
                    attempt = attempt,
                    delay_ms = delay_ms,
                    error = %error,
                    "Job failed; retry scheduled"
                );
            }
        }

        Ok(decision)
    }

    pub async fn stats(&self) -> Result<QueueStats> {
        self.store.stats().await
    }

    /// Snapshot of dead-lettered jobs; nothing is removed
    pub async fn dead_letter_jobs(&self) -> Result<Vec<Job>> {
        Ok(self
            .store
            .dead_letters()
            .await?
            .into_iter()
            .map(|dead| dead.entry.into_job())
            .collect())
    }

    /// Dead-letter entries with their last error and burial time
    pub async fn dead_letter_entries(&self) -> Result<Vec<DeadLetterEntry>> {
        self.store.dead_letters().await
    }

    /// Operator replay of a dead-lettered job.
    ///
    /// The dead entry is removed and a fresh job (new ID, zero attempts, same
    /// retry policy) is enqueued with `parent_job_id` pointing at it.
    pub async fn replay_dead_letter(&self, job_id: &str) -> Result<EnqueueAck> {
        let dead = self
            .store
            .take_dead_letter(job_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("dead-letter job {}", job_id)))?;

        let mut spec = dead.job().to_spec();
        let mut correlation = spec.correlation.take().unwrap_or_default();
        correlation.parent_job_id = Some(dead.job().id().to_string());
        spec.correlation = Some(correlation);
        let options =
            EnqueueOptions::default().with_retry_policy(dead.entry.retry_policy().clone());

        match self.enqueue(spec, options).await {
            Ok(ack) => {
                info!(
                    dead_job_id = %job_id,
                    job_id = %ack.job_id,
                    "Replayed dead-letter job"
                );
                Ok(ack)
            }
            Err(e) => {
                // Put it back so the operator can try again
                self.store.bury(dead).await?;
                Err(e)
            }
        }
    }

    /// Resolves after the next enqueue or retry re-insert
    pub async fn wait_ready(&self) {
        self.ready.notified().await;
    }

    fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst)
    }
}
