// Job Engine Core - Domain Logic, Ports & Worker Pool
// NO infrastructure dependencies (Hexagonal Architecture)

pub mod application;
pub mod domain;
pub mod error;
pub mod port;

pub use application::{
    handler_fn, EnqueueAck, EnqueueOptions, EnqueueRequest, HandlerRegistry, JobQueue,
    PoolStatus, RetryDecision, Scheduler, WorkerOptions, WorkerPool, WorkerStatsSnapshot,
};
pub use domain::{Correlation, DeadLetterEntry, Job, JobPriority, JobSpec, QueueStats, RetryPolicy};
pub use error::{AppError, Result};
pub use port::{HandlerFailure, HandlerResult, HandlerSuccess, JobHandler, JobStore};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
