//! Scheduler - owned facade over queue, handler registry and worker pool
//!
//! Every piece of engine state hangs off one `Scheduler` value, so several
//! independent schedulers can live in one process and tests never share state.
//!
//! ```text
//! producer --enqueue--> JobQueue --dequeue--> WorkerPool --resolve--> HandlerRegistry
//!                          ^                       |
//!                          +---- retry / bury <----+
//! ```

use crate::application::queue::{EnqueueAck, EnqueueOptions, JobQueue};
use crate::application::registry::HandlerRegistry;
use crate::application::worker::{PoolStatus, WorkerOptions, WorkerPool, WorkerStatsSnapshot};
use crate::domain::{DeadLetterEntry, Job, JobSpec, QueueStats};
use crate::error::Result;
use crate::port::{IdProvider, JobHandler, JobStore, SystemTimeProvider, TimeProvider, UuidProvider};
use std::sync::Arc;

pub struct Scheduler {
    queue: Arc<JobQueue>,
    registry: Arc<HandlerRegistry>,
    pool: WorkerPool,
}

impl Scheduler {
    /// Create a scheduler with all dependencies injected
    pub fn new(
        store: Arc<dyn JobStore>,
        id_provider: Arc<dyn IdProvider>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        let queue = Arc::new(JobQueue::new(store, id_provider, time_provider));
        let registry = Arc::new(HandlerRegistry::new());
        let pool = WorkerPool::new(Arc::clone(&queue), Arc::clone(&registry));
        Self {
            queue,
            registry,
            pool,
        }
    }

    /// Production wiring: UUID v4 IDs and the system clock
    pub fn with_system_clock(store: Arc<dyn JobStore>) -> Self {
        Self::new(store, Arc::new(UuidProvider), Arc::new(SystemTimeProvider))
    }

    // ------------------------------------------------------------------
    // Enqueue API
    // ------------------------------------------------------------------

    pub async fn enqueue(&self, spec: JobSpec, options: EnqueueOptions) -> Result<EnqueueAck> {
        self.queue.enqueue(spec, options).await
    }

    // ------------------------------------------------------------------
    // Handler registration
    // ------------------------------------------------------------------

    /// Fails with `AppError::Conflict` if `name` is taken
    pub fn register_handler<H>(&self, name: impl Into<String>, handler: H) -> Result<()>
    where
        H: JobHandler + 'static,
    {
        self.registry.register(name, handler)
    }

    // ------------------------------------------------------------------
    // Diagnostics
    // ------------------------------------------------------------------

    pub async fn queue_stats(&self) -> Result<QueueStats> {
        self.queue.stats().await
    }

    pub async fn dead_letter_jobs(&self) -> Result<Vec<Job>> {
        self.queue.dead_letter_jobs().await
    }

    pub async fn dead_letter_entries(&self) -> Result<Vec<DeadLetterEntry>> {
        self.queue.dead_letter_entries().await
    }

    pub async fn replay_dead_letter(&self, job_id: &str) -> Result<EnqueueAck> {
        self.queue.replay_dead_letter(job_id).await
    }

    pub fn worker_stats(&self) -> WorkerStatsSnapshot {
        self.pool.stats()
    }

    pub fn worker_status(&self) -> PoolStatus {
        self.pool.status()
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    pub async fn start_worker(&self, options: WorkerOptions) -> Result<()> {
        self.pool.start(options).await
    }

    /// Resolves once every in-flight job has finished
    pub async fn stop_worker(&self) -> Result<()> {
        self.pool.stop().await
    }

    pub fn queue(&self) -> &Arc<JobQueue> {
        &self.queue
    }

    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }
}
