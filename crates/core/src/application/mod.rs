// Application Layer - Use Cases and Engine Services

pub mod queue;
pub mod registry;
pub mod retry;
pub mod scheduler;
pub mod worker;

// Re-exports
pub use crate::port::handler_fn;
pub use queue::{EnqueueAck, EnqueueOptions, EnqueueRequest, JobQueue};
pub use registry::HandlerRegistry;
pub use retry::RetryDecision;
pub use scheduler::Scheduler;
pub use worker::{
    shutdown_channel, PoolStatus, ShutdownSender, ShutdownToken, WorkerOptions, WorkerPool,
    WorkerStatsSnapshot,
};
