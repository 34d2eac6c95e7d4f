// Job Handler Port
// Contract every domain handler (payments, audit, notifications, ...) satisfies

use crate::domain::Job;
use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;

/// Successful handler run
#[derive(Debug, Clone, PartialEq)]
pub struct HandlerSuccess {
    pub output: Option<serde_json::Value>,
    pub duration_ms: u64,
}

impl HandlerSuccess {
    pub fn new(duration_ms: u64) -> Self {
        Self {
            output: None,
            duration_ms,
        }
    }

    pub fn with_output(mut self, output: serde_json::Value) -> Self {
        self.output = Some(output);
        self
    }
}

/// Failed handler run (expected domain failure)
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{error}")]
pub struct HandlerFailure {
    pub error: String,
    pub duration_ms: u64,
}

impl HandlerFailure {
    pub fn new(error: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            error: error.into(),
            duration_ms,
        }
    }
}

pub type HandlerResult = std::result::Result<HandlerSuccess, HandlerFailure>;

/// Handler trait
///
/// Expected failures are returned as `Err(HandlerFailure)`. A panic is caught
/// by the dispatcher and retried like a failure, but logged as a fault.
#[async_trait]
pub trait JobHandler: Send + Sync {
    async fn handle(&self, job: &Job) -> HandlerResult;
}

#[async_trait]
impl<T> JobHandler for Arc<T>
where
    T: JobHandler + ?Sized,
{
    async fn handle(&self, job: &Job) -> HandlerResult {
        (**self).handle(job).await
    }
}

/// Handler backed by an async closure. Build with [`handler_fn`].
pub struct FnHandler<F> {
    f: F,
}

/// Adapt `Fn(Job) -> impl Future<Output = HandlerResult>` into a [`JobHandler`]
///
/// # Example
/// ```text
/// registry.register("audit.persist", handler_fn(|job| async move {
///     persist(job.payload()).await;
///     Ok(HandlerSuccess::new(0))
/// }))?;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    FnHandler { f }
}

#[async_trait]
impl<F, Fut> JobHandler for FnHandler<F>
where
    F: Fn(Job) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    async fn handle(&self, job: &Job) -> HandlerResult {
        (self.f)(job.clone()).await
    }
}

// ============================================================================
// Mock Implementations for Testing
// ============================================================================

pub mod mocks {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Mutex, PoisonError};
    use std::time::Duration;

    /// Mock handler behavior
    #[derive(Debug, Clone)]
    pub enum MockBehavior {
        /// Always succeed
        Succeed,
        /// Always fail with message
        Fail(String),
        /// Fail the first N calls, then succeed
        FailTimes(usize, String),
        /// Panic with message (for panic isolation testing)
        Panic(String),
        /// Sleep, then succeed
        Sleep(Duration),
    }

    /// Handler that records every call
    pub struct RecordingHandler {
        behavior: MockBehavior,
        calls: Mutex<Vec<String>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
    }

    impl RecordingHandler {
        pub fn new(behavior: MockBehavior) -> Self {
            Self {
                behavior,
                calls: Mutex::new(Vec::new()),
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
            }
        }

        pub fn succeeding() -> Self {
            Self::new(MockBehavior::Succeed)
        }

        pub fn failing(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Fail(message.into()))
        }

        pub fn panicking(message: impl Into<String>) -> Self {
            Self::new(MockBehavior::Panic(message.into()))
        }

        pub fn sleeping(duration: Duration) -> Self {
            Self::new(MockBehavior::Sleep(duration))
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).len()
        }

        /// Job IDs in call order
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap_or_else(PoisonError::into_inner).clone()
        }

        /// Highest number of overlapping calls observed
        pub fn max_in_flight(&self) -> usize {
            self.max_in_flight.load(Ordering::SeqCst)
        }
    }

    struct InFlight<'a>(&'a AtomicUsize);

    impl Drop for InFlight<'_> {
        fn drop(&mut self) {
            self.0.fetch_sub(1, Ordering::SeqCst);
        }
    }

    #[async_trait]
    impl JobHandler for RecordingHandler {
        async fn handle(&self, job: &Job) -> HandlerResult {
            let call_number = {
                let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
                calls.push(job.id().to_string());
                calls.len()
            };

            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);
            let _in_flight = InFlight(&self.in_flight);

            match &self.behavior {
                MockBehavior::Succeed => Ok(HandlerSuccess::new(1)),
                MockBehavior::Fail(msg) => Err(HandlerFailure::new(msg.clone(), 1)),
                MockBehavior::FailTimes(n, msg) => {
                    if call_number <= *n {
                        Err(HandlerFailure::new(msg.clone(), 1))
                    } else {
                        Ok(HandlerSuccess::new(1))
                    }
                }
                MockBehavior::Panic(msg) => {
                    panic!("{}", msg); // Actually panic for panic isolation testing
                }
                MockBehavior::Sleep(duration) => {
                    tokio::time::sleep(*duration).await;
                    Ok(HandlerSuccess::new(duration.as_millis() as u64))
                }
            }
        }
    }
}
