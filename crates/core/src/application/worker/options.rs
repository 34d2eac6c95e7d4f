// Worker pool options
use super::constants::{DEFAULT_CONCURRENCY, DEFAULT_POLL_INTERVAL_MS};
use crate::error::{AppError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the worker pool
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerOptions {
    /// Maximum concurrent handler executions
    pub concurrency: usize,
    /// Idle wait between poll ticks (milliseconds)
    pub poll_interval_ms: u64,
    /// Per-dispatch deadline (milliseconds). `None` lets a handler run unbounded.
    pub handler_timeout_ms: Option<u64>,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        Self {
            concurrency: DEFAULT_CONCURRENCY,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            handler_timeout_ms: None,
        }
    }
}

impl WorkerOptions {
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    pub fn with_poll_interval_ms(mut self, poll_interval_ms: u64) -> Self {
        self.poll_interval_ms = poll_interval_ms;
        self
    }

    pub fn with_handler_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.handler_timeout_ms = Some(timeout_ms);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.concurrency == 0 {
            return Err(AppError::Config(
                "worker concurrency must be at least 1".to_string(),
            ));
        }
        if self.poll_interval_ms == 0 {
            return Err(AppError::Config(
                "worker poll_interval_ms must be at least 1".to_string(),
            ));
        }
        if self.handler_timeout_ms == Some(0) {
            return Err(AppError::Config(
                "worker handler_timeout_ms must be at least 1 when set".to_string(),
            ));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn handler_timeout(&self) -> Option<Duration> {
        self.handler_timeout_ms.map(Duration::from_millis)
    }
}
