// Dispatch: claim eligible jobs, run handlers, settle outcomes

use super::options::WorkerOptions;
use super::panic_guard::panic_message;
use super::stats::WorkerStats;
use crate::application::queue::JobQueue;
use crate::application::registry::HandlerRegistry;
use crate::application::retry::RetryDecision;
use crate::domain::{Job, QueuedEntry};
use crate::error::Result;
use crate::port::{HandlerFailure, HandlerSuccess, JobHandler};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Notify;
use tracing::{error, info, info_span, warn, Instrument};

/// How a single handler run ended
#[derive(Debug)]
pub(crate) enum Outcome {
    Succeeded(HandlerSuccess),
    Failed(HandlerFailure),
    Panicked { message: String, duration_ms: u64 },
    TimedOut { limit_ms: u64 },
}

/// Holds one concurrency slot; releasing it on drop means the counter goes
/// down on every exit path, including panics inside settle.
struct ActiveSlot {
    active: Arc<AtomicUsize>,
    freed: Arc<Notify>,
}

impl ActiveSlot {
    fn acquire(active: &Arc<AtomicUsize>, freed: &Arc<Notify>) -> Self {
        active.fetch_add(1, Ordering::SeqCst);
        Self {
            active: Arc::clone(active),
            freed: Arc::clone(freed),
        }
    }
}

impl Drop for ActiveSlot {
    fn drop(&mut self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
        self.freed.notify_one();
    }
}

/// State shared by the poll loop and every in-flight dispatch
pub(crate) struct Dispatcher {
    pub(crate) queue: Arc<JobQueue>,
    registry: Arc<HandlerRegistry>,
    active: Arc<AtomicUsize>,
    pub(crate) slot_freed: Arc<Notify>,
    pub(crate) stats: WorkerStats,
}

impl Dispatcher {
    pub(crate) fn new(queue: Arc<JobQueue>, registry: Arc<HandlerRegistry>) -> Self {
        Self {
            queue,
            registry,
            active: Arc::new(AtomicUsize::new(0)),
            slot_freed: Arc::new(Notify::new()),
            stats: WorkerStats::new(),
        }
    }

    pub(crate) fn active(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }

    /// One poll tick: dequeue and dispatch until the pool is saturated or
    /// nothing is eligible. Returns the number of dispatches started.
    ///
    /// Only the poll loop increments `active`, so checking then acquiring a
    /// slot cannot overshoot `concurrency`.
    pub(crate) async fn tick(self: &Arc<Self>, options: &WorkerOptions) -> Result<usize> {
        let mut dispatched = 0;
        while self.active() < options.concurrency {
            let Some(entry) = self.queue.dequeue().await? else {
                break;
            };

            let Some(handler) = self.registry.resolve(entry.job().name()) else {
                self.stats.record_unroutable();
                error!(
                    job_id = %entry.job().id(),
                    job_name = %entry.job().name(),
                    category = %entry.job().category(),
                    "No handler registered for job; dropping without retry"
                );
                continue;
            };

            self.dispatch(entry, handler, options.handler_timeout());
            dispatched += 1;
        }
        Ok(dispatched)
    }

    fn dispatch(
        self: &Arc<Self>,
        entry: QueuedEntry,
        handler: Arc<dyn JobHandler>,
        timeout: Option<Duration>,
    ) {
        let slot = ActiveSlot::acquire(&self.active, &self.slot_freed);
        self.stats.record_dispatched();

        let job = entry.job();
        let span = info_span!(
            "dispatch",
            job_id = %job.id(),
            job_name = %job.name(),
            attempt = job.attempts() + 1,
            trace_id = job.trace_id().unwrap_or_default(),
        );

        let this = Arc::clone(self);
        tokio::spawn(
            async move {
                let _slot = slot;
                let outcome = execute(handler, entry.job().clone(), timeout).await;
                this.settle(entry, outcome).await;
            }
            .instrument(span),
        );
    }

    /// Feed a finished run back to the queue
    pub(crate) async fn settle(&self, entry: QueuedEntry, outcome: Outcome) {
        let error = match outcome {
            Outcome::Succeeded(success) => {
                self.stats.record_succeeded();
                info!(
                    duration_ms = success.duration_ms,
                    has_output = success.output.is_some(),
                    "Job completed"
                );
                return;
            }
            Outcome::Failed(failure) => {
                warn!(
                    error = %failure.error,
                    duration_ms = failure.duration_ms,
                    "Job handler returned failure"
                );
                failure.error
            }
            Outcome::Panicked {
                message,
                duration_ms,
            } => {
                error!(
                    panic = %message,
                    duration_ms = duration_ms,
                    "Job handler panicked (unexpected fault)"
                );
                format!("handler panicked: {}", message)
            }
            Outcome::TimedOut { limit_ms } => {
                warn!(limit_ms = limit_ms, "Job handler timed out");
                format!("handler timed out after {}ms", limit_ms)
            }
        };

        self.stats.record_failed();
        let job_id = entry.job().id().to_string();
        match self.queue.retry(entry, &error).await {
            Ok(RetryDecision::Retry { .. }) => self.stats.record_retried(),
            Ok(RetryDecision::DeadLettered { .. }) => self.stats.record_dead_lettered(),
            Err(e) => error!(
                job_id = %job_id,
                error = %e,
                "Failed to record job failure; job is no longer queued"
            ),
        }
    }
}

/// Run the handler in its own task so a panic stays inside that task
pub(crate) async fn execute(
    handler: Arc<dyn JobHandler>,
    job: Job,
    timeout: Option<Duration>,
) -> Outcome {
    let started = Instant::now();
    let mut task = tokio::spawn(async move { handler.handle(&job).await }.in_current_span());

    let joined = match timeout {
        Some(limit) => match tokio::time::timeout(limit, &mut task).await {
            Ok(joined) => joined,
            Err(_) => {
                task.abort();
                // Keep the slot until the handler has actually stopped; a
                // handler that never yields only ends when its body returns.
                let _ = (&mut task).await;
                return Outcome::TimedOut {
                    limit_ms: limit.as_millis() as u64,
                };
            }
        },
        None => task.await,
    };

    let duration_ms = started.elapsed().as_millis() as u64;
    match joined {
        Ok(Ok(success)) => Outcome::Succeeded(success),
        Ok(Err(failure)) => Outcome::Failed(failure),
        Err(join_err) if join_err.is_panic() => Outcome::Panicked {
            message: panic_message(join_err.into_panic().as_ref()),
            duration_ms,
        },
        Err(join_err) => Outcome::Failed(HandlerFailure::new(
            format!("handler task cancelled: {}", join_err),
            duration_ms,
        )),
    }
}
