//! Unit tests for enqueue validation

#[cfg(test)]
mod tests {
    use super::super::enqueue::*;
    use crate::domain::{JobPriority, JobSpec, RetryPolicy};
    use serde_json::json;

    fn spec() -> JobSpec {
        JobSpec::new("payment.capture", "payments", JobPriority::High, json!({"amount": 10}))
    }

    #[test]
    fn test_validate_name_empty() {
        let mut s = spec();
        s.name = "".to_string();

        let result = validate_request(&s, &EnqueueOptions::default());
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("name must not be empty"));
    }

    #[test]
    fn test_validate_category_empty() {
        let mut s = spec();
        s.category = " ".to_string();

        let result = validate_request(&s, &EnqueueOptions::default());
        assert!(result.unwrap_err().to_string().contains("category"));
    }

    #[test]
    fn test_validate_bad_retry_policy() {
        let options = EnqueueOptions::default().with_retry_policy(RetryPolicy {
            max_attempts: 0,
            ..RetryPolicy::default()
        });

        let result = validate_request(&spec(), &options);
        assert!(result.unwrap_err().to_string().contains("max_attempts"));
    }

    #[test]
    fn test_validate_valid_request() {
        let result = validate_request(&spec(), &EnqueueOptions::default().with_delay_ms(500));
        assert!(result.is_ok());
    }

    #[test]
    fn test_request_rejects_caller_supplied_identity() {
        for field in ["id", "createdAt", "attempts"] {
            let mut body = json!({
                "name": "audit.persist",
                "category": "audit",
                "priority": "normal",
                "payload": {}
            });
            body[field] = json!(1);

            let parsed = serde_json::from_value::<EnqueueRequest>(body);
            assert!(parsed.is_err(), "{} should be rejected", field);
        }
    }

    #[test]
    fn test_request_requires_priority() {
        let body = json!({"name": "audit.persist", "category": "audit", "payload": {}});
        assert!(serde_json::from_value::<EnqueueRequest>(body).is_err());
    }

    #[test]
    fn test_request_into_parts() {
        let body = json!({
            "name": "notification.deliver",
            "category": "notifications",
            "priority": "critical",
            "payload": {"to": "ops"},
            "delayMs": 250,
            "retryPolicy": {"maxAttempts": 2},
            "correlation": {"requestId": "req-1"}
        });

        let request: EnqueueRequest = serde_json::from_value(body).unwrap();
        let (spec, options) = request.into_parts();

        assert_eq!(spec.priority, JobPriority::Critical);
        assert_eq!(spec.version, 1);
        assert_eq!(options.delay_ms, 250);
        assert_eq!(options.retry_policy.unwrap().max_attempts, 2);
        assert_eq!(
            spec.correlation.unwrap().request_id.as_deref(),
            Some("req-1")
        );
    }

    #[test]
    fn test_available_at_uses_later_of_delay_and_schedule() {
        assert_eq!(available_at(1_000, 0, None), 1_000);
        assert_eq!(available_at(1_000, 500, None), 1_500);
        assert_eq!(available_at(1_000, 500, Some(5_000)), 5_000);
        assert_eq!(available_at(1_000, 9_000, Some(5_000)), 10_000);
        assert_eq!(available_at(i64::MAX - 1, u64::MAX, None), i64::MAX);
    }
}
