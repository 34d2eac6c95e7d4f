// Retry Policy & Backoff

use serde::{Deserialize, Serialize};

use crate::domain::error::{DomainError, Result};

/// Per-job retry budget and exponential backoff shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RetryPolicy {
    /// Attempts after which the job is dead-lettered instead of retried
    pub max_attempts: u32,
    pub initial_delay_ms: u64,
    pub backoff_multiplier: f64,
    pub max_delay_ms: u64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 60_000,
        }
    }
}

impl RetryPolicy {
    pub fn validate(&self) -> Result<()> {
        if self.max_attempts == 0 {
            return Err(DomainError::InvalidRetryPolicy(
                "max_attempts must be at least 1".to_string(),
            ));
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(DomainError::InvalidRetryPolicy(format!(
                "backoff_multiplier must be a finite value >= 1.0, got {}",
                self.backoff_multiplier
            )));
        }
        if self.initial_delay_ms > self.max_delay_ms {
            return Err(DomainError::InvalidRetryPolicy(format!(
                "initial_delay_ms ({}) exceeds max_delay_ms ({})",
                self.initial_delay_ms, self.max_delay_ms
            )));
        }
        Ok(())
    }

    /// True once `attempts` has used up the budget
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }

    pub fn next_delay_ms(&self, attempt: u32) -> u64 {
        next_delay_ms(self, attempt)
    }
}

/// Backoff delay before retry number `attempt` (post-increment count, 1-based).
///
/// `min(initial_delay_ms * backoff_multiplier^(attempt - 1), max_delay_ms)`.
/// Attempt 0 is treated as 1.
pub fn next_delay_ms(policy: &RetryPolicy, attempt: u32) -> u64 {
    let exponent = attempt.saturating_sub(1).min(i32::MAX as u32) as i32;
    let raw = policy.initial_delay_ms as f64 * policy.backoff_multiplier.powi(exponent);
    let capped = raw.min(policy.max_delay_ms as f64);
    if capped.is_nan() {
        return policy.max_delay_ms;
    }
    capped as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_policy() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.initial_delay_ms, 1_000);
        assert_eq!(policy.backoff_multiplier, 2.0);
        assert_eq!(policy.max_delay_ms, 60_000);
        assert!(policy.validate().is_ok());
    }

    #[test]
    fn test_backoff_table() {
        let policy = RetryPolicy {
            max_attempts: 5,
            initial_delay_ms: 1_000,
            backoff_multiplier: 2.0,
            max_delay_ms: 8_000,
        };
        let cases = [(1, 1_000), (2, 2_000), (3, 4_000), (4, 8_000), (5, 8_000)];
        for (attempt, expected) in cases {
            assert_eq!(next_delay_ms(&policy, attempt), expected, "attempt {}", attempt);
        }
    }

    #[test]
    fn test_first_retry_uses_initial_delay() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.next_delay_ms(1), 1_000);
        assert_eq!(policy.next_delay_ms(0), 1_000);
    }

    #[test]
    fn test_backoff_is_monotonic_and_capped() {
        let policy = RetryPolicy {
            max_attempts: 100,
            initial_delay_ms: 250,
            backoff_multiplier: 3.0,
            max_delay_ms: 45_000,
        };
        let mut previous = 0;
        for attempt in 1..=200 {
            let delay = next_delay_ms(&policy, attempt);
            assert!(delay >= previous, "delay shrank at attempt {}", attempt);
            assert!(delay <= policy.max_delay_ms);
            previous = delay;
        }
    }

    #[test]
    fn test_huge_attempt_saturates_at_cap() {
        let policy = RetryPolicy::default();
        assert_eq!(next_delay_ms(&policy, u32::MAX), policy.max_delay_ms);
    }

    #[test]
    fn test_multiplier_one_is_constant() {
        let policy = RetryPolicy {
            backoff_multiplier: 1.0,
            ..RetryPolicy::default()
        };
        assert_eq!(next_delay_ms(&policy, 1), 1_000);
        assert_eq!(next_delay_ms(&policy, 7), 1_000);
    }

    #[test]
    fn test_validate_rejects_bad_policies() {
        let zero_attempts = RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        };
        assert!(zero_attempts.validate().is_err());

        let shrinking = RetryPolicy {
            backoff_multiplier: 0.5,
            ..RetryPolicy::default()
        };
        assert!(shrinking.validate().is_err());

        let inverted = RetryPolicy {
            initial_delay_ms: 10_000,
            max_delay_ms: 1_000,
            ..RetryPolicy::default()
        };
        assert!(inverted.validate().is_err());

        let nan = RetryPolicy {
            backoff_multiplier: f64::NAN,
            ..RetryPolicy::default()
        };
        assert!(nan.validate().is_err());
    }

    #[test]
    fn test_is_exhausted() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(4));
        assert!(policy.is_exhausted(5));
        assert!(policy.is_exhausted(6));
    }

    #[test]
    fn test_partial_policy_deserializes_with_defaults() {
        let policy: RetryPolicy =
            serde_json::from_value(serde_json::json!({"maxAttempts": 2})).unwrap();
        assert_eq!(policy.max_attempts, 2);
        assert_eq!(policy.max_delay_ms, 60_000);
    }
}
