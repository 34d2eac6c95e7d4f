// Retry decision logic
use crate::domain::RetryPolicy;

/// Retry decision result
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Re-insert the job once the backoff delay has passed
    Retry {
        attempt: u32,
        delay_ms: u64,
        /// Next eligible time (epoch ms)
        available_at: i64,
    },
    /// Retry budget exhausted, job moves to the dead-letter store
    DeadLettered { attempts: u32 },
}

impl RetryDecision {
    pub fn is_dead_lettered(&self) -> bool {
        matches!(self, RetryDecision::DeadLettered { .. })
    }
}

/// Decide what happens after a failure
///
/// `attempt` is the post-increment attempt count, i.e. it already includes the
/// failure being handled.
///
/// # Example
/// ```text
/// match decide(&policy, job.attempts(), now) {
///     RetryDecision::Retry { available_at, .. } => requeue(entry, available_at),
///     RetryDecision::DeadLettered { .. } => bury(entry),
/// }
/// ```
pub fn decide(policy: &RetryPolicy, attempt: u32, now_millis: i64) -> RetryDecision {
    if policy.is_exhausted(attempt) {
        return RetryDecision::DeadLettered { attempts: attempt };
    }

    let delay_ms = policy.next_delay_ms(attempt);
    let available_at = now_millis.saturating_add(i64::try_from(delay_ms).unwrap_or(i64::MAX));
    RetryDecision::Retry {
        attempt,
        delay_ms,
        available_at,
    }
}
