// Enqueue Use Case

use crate::domain::{
    Correlation, Job, JobId, JobPayload, JobPriority, JobSpec, QueuedEntry, RetryPolicy,
};
use crate::error::Result;
use crate::port::{IdProvider, JobStore, TimeProvider};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Per-enqueue knobs
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EnqueueOptions {
    /// Falls back to `RetryPolicy::default()`
    pub retry_policy: Option<RetryPolicy>,
    pub delay_ms: u64,
}

impl EnqueueOptions {
    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry_policy = Some(policy);
        self
    }

    pub fn with_delay_ms(mut self, delay_ms: u64) -> Self {
        self.delay_ms = delay_ms;
        self
    }
}

/// Acknowledgement returned to producers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EnqueueAck {
    pub job_id: JobId,
    pub accepted: bool,
    /// Enqueue time (epoch ms)
    pub queued_at: i64,
}

/// Wire form of an enqueue call for JSON producers.
///
/// Unknown fields are rejected, so producers cannot smuggle in `id`,
/// `createdAt` or `attempts`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct EnqueueRequest {
    pub name: String,
    pub category: String,
    pub priority: JobPriority,
    pub payload: serde_json::Value,

    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub scheduled_at: Option<i64>,
    #[serde(default)]
    pub correlation: Option<Correlation>,
    #[serde(default)]
    pub retry_policy: Option<RetryPolicy>,
    #[serde(default)]
    pub delay_ms: u64,
}

fn default_version() -> u32 {
    1
}

impl EnqueueRequest {
    pub fn into_parts(self) -> (JobSpec, EnqueueOptions) {
        let spec = JobSpec {
            name: self.name,
            category: self.category,
            priority: self.priority,
            payload: JobPayload::new(self.payload),
            version: self.version,
            scheduled_at: self.scheduled_at,
            correlation: self.correlation,
        };
        let options = EnqueueOptions {
            retry_policy: self.retry_policy,
            delay_ms: self.delay_ms,
        };
        (spec, options)
    }
}

/// Reject contract violations before anything touches the store
pub fn validate_request(spec: &JobSpec, options: &EnqueueOptions) -> Result<()> {
    spec.validate()?;
    if let Some(policy) = &options.retry_policy {
        policy.validate()?;
    }
    Ok(())
}

/// `max(created_at + delay_ms, scheduled_at)`
pub(crate) fn available_at(created_at: i64, delay_ms: u64, scheduled_at: Option<i64>) -> i64 {
    let delayed = created_at.saturating_add(i64::try_from(delay_ms).unwrap_or(i64::MAX));
    scheduled_at.map_or(delayed, |at| delayed.max(at))
}

/// Execute enqueue use case
///
/// # Arguments
///
/// * `store` - Job store
/// * `id_provider` - ID generator (injected for determinism)
/// * `time_provider` - Time provider (injected for determinism)
/// * `sequence` - Insertion sequence for FIFO tie-breaks
/// * `spec` - Producer-supplied job description
/// * `options` - Retry policy and delay
pub(crate) async fn execute(
    store: &dyn JobStore,
    id_provider: &dyn IdProvider,
    time_provider: &dyn TimeProvider,
    sequence: u64,
    spec: JobSpec,
    options: EnqueueOptions,
) -> Result<EnqueueAck> {
    validate_request(&spec, &options)?;

    // Create new job (with injected ID and timestamp for determinism)
    let job_id = id_provider.generate_id();
    let created_at = time_provider.now_millis();
    let job = Job::from_spec(job_id.clone(), created_at, spec);

    let available_at = available_at(created_at, options.delay_ms, job.scheduled_at());
    let retry_policy = options.retry_policy.unwrap_or_default();

    debug!(
        job_id = %job_id,
        job_name = %job.name(),
        priority = %job.priority(),
        available_at = available_at,
        "Enqueueing job"
    );

    store
        .push(QueuedEntry::new(job, retry_policy, available_at, sequence))
        .await?;

    Ok(EnqueueAck {
        job_id,
        accepted: true,
        queued_at: created_at,
    })
}
