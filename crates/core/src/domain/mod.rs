// Domain Layer - Pure business logic and entities

pub mod entry;
pub mod error;
pub mod job;
pub mod retry;

// Re-exports
pub use entry::{DeadLetterEntry, DispatchKey, QueueStats, QueuedEntry};
pub use error::DomainError;
pub use job::{job_name_problem, Correlation, Job, JobId, JobPayload, JobPriority, JobSpec};
pub use retry::{next_delay_ms, RetryPolicy};
