//! Fault isolation: handler panics, timeouts, routing defects and store faults

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use jobengine_core::domain::{DeadLetterEntry, QueueStats, QueuedEntry};
use jobengine_core::port::job_handler::mocks::RecordingHandler;
use jobengine_core::{
    AppError, EnqueueOptions, HandlerResult, HandlerSuccess, Job, JobHandler, JobPriority,
    JobSpec, JobStore, Result, RetryPolicy, Scheduler, WorkerOptions,
};
use jobengine_infra_memory::MemoryJobStore;
use serde_json::json;

const WAIT_LIMIT: Duration = Duration::from_secs(5);

fn options() -> WorkerOptions {
    WorkerOptions::default()
        .with_concurrency(2)
        .with_poll_interval_ms(5)
}

fn single_attempt() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 1,
        ..RetryPolicy::default()
    }
}

async fn enqueue(scheduler: &Scheduler, name: &str, policy: RetryPolicy) -> String {
    scheduler
        .enqueue(
            JobSpec::new(name, "test", JobPriority::Normal, json!({})),
            EnqueueOptions::default().with_retry_policy(policy),
        )
        .await
        .unwrap()
        .job_id
}

async fn wait_until<F, Fut>(mut check: F)
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let waited = tokio::time::timeout(WAIT_LIMIT, async {
        while !check().await {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;
    assert!(waited.is_ok(), "condition not met within {:?}", WAIT_LIMIT);
}

/// Store whose `claim_next` fails a fixed number of times before delegating
struct FlakyStore {
    inner: MemoryJobStore,
    claim_failures_left: AtomicUsize,
    claim_failures_seen: AtomicUsize,
}

impl FlakyStore {
    fn new(claim_failures: usize) -> Self {
        Self {
            inner: MemoryJobStore::new(),
            claim_failures_left: AtomicUsize::new(claim_failures),
            claim_failures_seen: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn push(&self, entry: QueuedEntry) -> Result<()> {
        self.inner.push(entry).await
    }

    async fn claim_next(&self, now_millis: i64) -> Result<Option<QueuedEntry>> {
        let left = self.claim_failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.claim_failures_left.store(left - 1, Ordering::SeqCst);
            self.claim_failures_seen.fetch_add(1, Ordering::SeqCst);
            return Err(AppError::Store("connection reset".to_string()));
        }
        self.inner.claim_next(now_millis).await
    }

    async fn bury(&self, dead: DeadLetterEntry) -> Result<()> {
        self.inner.bury(dead).await
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetterEntry>> {
        self.inner.dead_letters().await
    }

    async fn take_dead_letter(&self, job_id: &str) -> Result<Option<DeadLetterEntry>> {
        self.inner.take_dead_letter(job_id).await
    }

    async fn stats(&self) -> Result<QueueStats> {
        self.inner.stats().await
    }
}

#[tokio::test]
async fn test_handler_panic_is_retried_and_isolated() {
    let scheduler = Scheduler::with_system_clock(Arc::new(MemoryJobStore::new()));
    let panicking = Arc::new(RecordingHandler::panicking("index out of bounds"));
    let healthy = Arc::new(RecordingHandler::succeeding());
    scheduler.registry().register_arc("broken", panicking.clone()).unwrap();
    scheduler.registry().register_arc("healthy", healthy.clone()).unwrap();

    let broken_id = enqueue(
        &scheduler,
        "broken",
        RetryPolicy {
            max_attempts: 2,
            initial_delay_ms: 5,
            backoff_multiplier: 1.0,
            max_delay_ms: 5,
        },
    )
    .await;
    scheduler.start_worker(options()).await.unwrap();

    wait_until(|| async { scheduler.queue_stats().await.unwrap().dead == 1 }).await;

    // Pool is still serving other jobs after the panics
    enqueue(&scheduler, "healthy", RetryPolicy::default()).await;
    wait_until(|| async { healthy.call_count() == 1 }).await;
    scheduler.stop_worker().await.unwrap();

    assert_eq!(panicking.call_count(), 2);
    let entries = scheduler.dead_letter_entries().await.unwrap();
    assert_eq!(entries[0].job().id(), broken_id);
    assert!(entries[0].last_error.contains("handler panicked"));
    assert!(entries[0].last_error.contains("index out of bounds"));

    let stats = scheduler.worker_stats();
    assert_eq!(stats.active, 0);
    assert_eq!(stats.failed, 2);
    assert_eq!(stats.succeeded, 1);
}

#[tokio::test]
async fn test_hung_handler_times_out_into_retry_path() {
    let scheduler = Scheduler::with_system_clock(Arc::new(MemoryJobStore::new()));
    let hung = Arc::new(RecordingHandler::sleeping(Duration::from_secs(30)));
    scheduler.registry().register_arc("hung", hung.clone()).unwrap();

    enqueue(&scheduler, "hung", single_attempt()).await;
    scheduler
        .start_worker(options().with_handler_timeout_ms(50))
        .await
        .unwrap();

    wait_until(|| async { scheduler.queue_stats().await.unwrap().dead == 1 }).await;
    scheduler.stop_worker().await.unwrap();

    let entries = scheduler.dead_letter_entries().await.unwrap();
    assert_eq!(entries[0].last_error, "handler timed out after 50ms");
    assert_eq!(scheduler.worker_stats().active, 0);
}

#[tokio::test]
async fn test_unroutable_job_is_dropped_without_retry() {
    let scheduler = Scheduler::with_system_clock(Arc::new(MemoryJobStore::new()));
    let handler = Arc::new(RecordingHandler::succeeding());
    scheduler.registry().register_arc("known", handler.clone()).unwrap();

    enqueue(&scheduler, "unknown", RetryPolicy::default()).await;
    enqueue(&scheduler, "known", RetryPolicy::default()).await;
    scheduler.start_worker(options()).await.unwrap();

    wait_until(|| async { handler.call_count() == 1 }).await;
    wait_until(|| async { scheduler.worker_stats().unroutable == 1 }).await;
    scheduler.stop_worker().await.unwrap();

    let queue = scheduler.queue_stats().await.unwrap();
    assert_eq!(queue.pending, 0);
    assert_eq!(queue.dead, 0);

    let stats = scheduler.worker_stats();
    assert_eq!(stats.dispatched, 1);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn test_store_fault_does_not_stop_the_loop() {
    let store = Arc::new(FlakyStore::new(3));
    let scheduler = Scheduler::with_system_clock(store.clone());
    let handler = Arc::new(RecordingHandler::succeeding());
    scheduler.registry().register_arc("steady", handler.clone()).unwrap();

    enqueue(&scheduler, "steady", RetryPolicy::default()).await;
    scheduler.start_worker(options()).await.unwrap();

    wait_until(|| async { handler.call_count() == 1 }).await;
    scheduler.stop_worker().await.unwrap();

    assert_eq!(store.claim_failures_seen.load(Ordering::SeqCst), 3);
    assert_eq!(scheduler.worker_stats().succeeded, 1);
}

/// Store whose first `claim_next` panics instead of returning
struct PanickingStore {
    inner: MemoryJobStore,
    armed: AtomicBool,
}

#[async_trait]
impl JobStore for PanickingStore {
    async fn push(&self, entry: QueuedEntry) -> Result<()> {
        self.inner.push(entry).await
    }

    async fn claim_next(&self, now_millis: i64) -> Result<Option<QueuedEntry>> {
        if self.armed.swap(false, Ordering::SeqCst) {
            panic!("claim cursor corrupted");
        }
        self.inner.claim_next(now_millis).await
    }

    async fn bury(&self, dead: DeadLetterEntry) -> Result<()> {
        self.inner.bury(dead).await
    }

    async fn dead_letters(&self) -> Result<Vec<DeadLetterEntry>> {
        self.inner.dead_letters().await
    }

    async fn take_dead_letter(&self, job_id: &str) -> Result<Option<DeadLetterEntry>> {
        self.inner.take_dead_letter(job_id).await
    }

    async fn stats(&self) -> Result<QueueStats> {
        self.inner.stats().await
    }
}

#[tokio::test]
async fn test_panic_in_poll_tick_does_not_stop_the_loop() {
    let store = Arc::new(PanickingStore {
        inner: MemoryJobStore::new(),
        armed: AtomicBool::new(true),
    });
    let scheduler = Scheduler::with_system_clock(store.clone());
    let handler = Arc::new(RecordingHandler::succeeding());
    scheduler.registry().register_arc("steady", handler.clone()).unwrap();

    enqueue(&scheduler, "steady", RetryPolicy::default()).await;
    scheduler.start_worker(options()).await.unwrap();

    wait_until(|| async { handler.call_count() == 1 }).await;

    // Still dispatching after the faulted tick
    enqueue(&scheduler, "steady", RetryPolicy::default()).await;
    wait_until(|| async { handler.call_count() == 2 }).await;
    scheduler.stop_worker().await.unwrap();

    assert!(!store.armed.load(Ordering::SeqCst));
    assert_eq!(scheduler.worker_stats().succeeded, 2);
}

/// Handler that blocks its thread and records overlapping executions
#[derive(Default)]
struct BlockingHandler {
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

#[async_trait]
impl JobHandler for BlockingHandler {
    async fn handle(&self, _job: &Job) -> HandlerResult {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);
        // No await point: aborting the task cannot cut this short
        std::thread::sleep(Duration::from_millis(100));
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        Ok(HandlerSuccess::new(100))
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_timed_out_handler_keeps_its_slot_until_it_returns() {
    let scheduler = Scheduler::with_system_clock(Arc::new(MemoryJobStore::new()));
    let handler = Arc::new(BlockingHandler::default());
    scheduler.registry().register_arc("blocking", handler.clone()).unwrap();

    enqueue(
        &scheduler,
        "blocking",
        RetryPolicy {
            max_attempts: 3,
            initial_delay_ms: 1,
            backoff_multiplier: 1.0,
            max_delay_ms: 1,
        },
    )
    .await;
    scheduler
        .start_worker(
            WorkerOptions::default()
                .with_concurrency(1)
                .with_poll_interval_ms(5)
                .with_handler_timeout_ms(20),
        )
        .await
        .unwrap();

    wait_until(|| async { scheduler.queue_stats().await.unwrap().dead == 1 }).await;
    scheduler.stop_worker().await.unwrap();

    assert_eq!(handler.calls.load(Ordering::SeqCst), 3);
    assert_eq!(handler.max_in_flight.load(Ordering::SeqCst), 1);

    let entries = scheduler.dead_letter_entries().await.unwrap();
    assert_eq!(entries[0].last_error, "handler timed out after 20ms");
}
