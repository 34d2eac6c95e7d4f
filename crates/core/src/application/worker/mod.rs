// Worker Pool - bounded-concurrency polling dispatcher

pub mod constants;
mod dispatch;
mod options;
mod panic_guard;
mod shutdown;
mod stats;

use constants::DRAIN_POLL_INTERVAL;
pub use options::WorkerOptions;
pub use panic_guard::{catch_fault, panic_message};
pub use shutdown::{shutdown_channel, ShutdownSender, ShutdownToken};
pub use stats::{WorkerStats, WorkerStatsSnapshot};

use crate::application::queue::JobQueue;
use crate::application::registry::HandlerRegistry;
use crate::error::Result;
use dispatch::Dispatcher;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

/// Global pool state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolStatus {
    Stopped,
    Running,
    Stopping,
}

impl PoolStatus {
    fn from_u8(value: u8) -> Self {
        match value {
            1 => PoolStatus::Running,
            2 => PoolStatus::Stopping,
            _ => PoolStatus::Stopped,
        }
    }

    fn as_u8(self) -> u8 {
        match self {
            PoolStatus::Stopped => 0,
            PoolStatus::Running => 1,
            PoolStatus::Stopping => 2,
        }
    }
}

struct RunningLoop {
    shutdown: ShutdownSender,
    handle: JoinHandle<()>,
}

/// Worker pool that drains a [`JobQueue`] into registered handlers.
///
/// One poll loop task fans out up to `concurrency` dispatch tasks. Handler
/// failures never reach the caller; they go through `JobQueue::retry`.
pub struct WorkerPool {
    dispatcher: Arc<Dispatcher>,
    status: AtomicU8,
    control: Mutex<Option<RunningLoop>>,
}

impl WorkerPool {
    pub fn new(queue: Arc<JobQueue>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            dispatcher: Arc::new(Dispatcher::new(queue, registry)),
            status: AtomicU8::new(PoolStatus::Stopped.as_u8()),
            control: Mutex::new(None),
        }
    }

    /// Start the poll loop. A no-op while already running.
    pub async fn start(&self, options: WorkerOptions) -> Result<()> {
        let mut control = self.control.lock().await;
        if control.is_some() {
            debug!("Worker pool already running; start ignored");
            return Ok(());
        }
        options.validate()?;

        let (shutdown, token) = shutdown_channel();
        let handle = tokio::spawn(run(Arc::clone(&self.dispatcher), options, token));
        *control = Some(RunningLoop { shutdown, handle });
        self.set_status(PoolStatus::Running);
        Ok(())
    }

    /// Stop dequeuing and wait for every in-flight dispatch to finish.
    ///
    /// Returns immediately when the pool is already stopped.
    pub async fn stop(&self) -> Result<()> {
        let mut control = self.control.lock().await;
        let Some(running) = control.take() else {
            return Ok(());
        };

        self.set_status(PoolStatus::Stopping);
        info!(
            active = self.active(),
            "Stopping worker pool; draining in-flight jobs"
        );

        running.shutdown.shutdown();
        if let Err(e) = running.handle.await {
            error!(error = %e, "Worker loop task ended abnormally");
        }

        while self.active() > 0 {
            sleep(DRAIN_POLL_INTERVAL).await;
        }

        self.set_status(PoolStatus::Stopped);
        let stats = self.stats();
        info!(
            dispatched = stats.dispatched,
            succeeded = stats.succeeded,
            failed = stats.failed,
            dead_lettered = stats.dead_lettered,
            "Worker pool stopped"
        );
        Ok(())
    }

    pub fn status(&self) -> PoolStatus {
        PoolStatus::from_u8(self.status.load(Ordering::SeqCst))
    }

    /// In-flight handler executions
    pub fn active(&self) -> usize {
        self.dispatcher.active()
    }

    pub fn stats(&self) -> WorkerStatsSnapshot {
        self.dispatcher.stats.snapshot(self.active())
    }

    fn set_status(&self, status: PoolStatus) {
        self.status.store(status.as_u8(), Ordering::SeqCst);
    }
}

/// Poll loop. Runs until shutdown is signalled.
///
/// Between ticks it waits `poll_interval`, waking early when a job is
/// enqueued or a slot frees up.
async fn run(dispatcher: Arc<Dispatcher>, options: WorkerOptions, mut shutdown: ShutdownToken) {
    info!(
        concurrency = options.concurrency,
        poll_interval_ms = options.poll_interval_ms,
        handler_timeout_ms = ?options.handler_timeout_ms,
        "Worker pool started"
    );
    let poll_interval = options.poll_interval();

    loop {
        if shutdown.is_shutdown() {
            break;
        }

        match catch_fault(dispatcher.tick(&options)).await {
            Ok(Ok(0)) => {}
            Ok(Ok(dispatched)) => debug!(dispatched = dispatched, "Dispatched jobs"),
            Ok(Err(e)) => error!(error = %e, "Worker loop fault; continuing"),
            Err(panic) => error!(panic = %panic, "Worker loop panicked; continuing"),
        }

        tokio::select! {
            _ = sleep(poll_interval) => {},
            _ = dispatcher.queue.wait_ready() => {},
            _ = dispatcher.slot_freed.notified() => {},
            _ = shutdown.wait() => break,
        }
    }

    info!("Worker loop exited");
}
