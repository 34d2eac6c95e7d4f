//! Demo handlers and heartbeat producer

use crate::config::DemoConfig;
use jobengine_core::{
    handler_fn, EnqueueOptions, HandlerFailure, HandlerSuccess, JobPriority, JobSpec, RetryPolicy,
    Scheduler,
};
use rand::Rng;
use serde_json::json;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;
use tracing::{info, warn};

pub const AUDIT_PERSIST: &str = "audit.persist";
pub const NOTIFICATION_DELIVER: &str = "notification.deliver";

/// Register the demo handlers on `scheduler`
pub fn register_handlers(scheduler: &Scheduler, failure_rate: f64) -> anyhow::Result<()> {
    scheduler.register_handler(
        AUDIT_PERSIST,
        handler_fn(|job| async move {
            let started = Instant::now();
            info!(
                job_id = %job.id(),
                payload = %job.payload().as_value(),
                "Audit record persisted"
            );
            Ok(HandlerSuccess::new(started.elapsed().as_millis() as u64))
        }),
    )?;

    scheduler.register_handler(
        NOTIFICATION_DELIVER,
        handler_fn(move |job| async move {
            let started = Instant::now();
            let failed = rand::thread_rng().gen_bool(failure_rate);
            let duration_ms = started.elapsed().as_millis() as u64;
            if failed {
                return Err(HandlerFailure::new(
                    format!("notification gateway unavailable (attempt {})", job.attempts() + 1),
                    duration_ms,
                ));
            }
            Ok(HandlerSuccess::new(duration_ms).with_output(json!({ "delivered": true })))
        }),
    )?;

    Ok(())
}

/// `JobSpec` for the `tick`-th heartbeat job; alternates between the demo handlers
pub fn heartbeat_spec(tick: u64) -> JobSpec {
    if tick % 2 == 0 {
        JobSpec::new(
            AUDIT_PERSIST,
            "audit",
            JobPriority::Low,
            json!({ "event": "heartbeat", "tick": tick }),
        )
    } else {
        JobSpec::new(
            NOTIFICATION_DELIVER,
            "notification",
            JobPriority::High,
            json!({ "channel": "email", "tick": tick }),
        )
    }
}

/// Enqueue one heartbeat job per interval until `stop` flips to `true`
pub async fn run_producer(
    scheduler: Arc<Scheduler>,
    demo: DemoConfig,
    retry: RetryPolicy,
    mut stop: watch::Receiver<bool>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(demo.heartbeat_interval_secs));
    let mut tick: u64 = 0;

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = stop.wait_for(|stopped| *stopped) => break,
        }

        let options = EnqueueOptions::default().with_retry_policy(retry.clone());
        match scheduler.enqueue(heartbeat_spec(tick), options).await {
            Ok(ack) => info!(job_id = %ack.job_id, tick = tick, "Heartbeat job enqueued"),
            Err(e) => warn!(error = %e, tick = tick, "Heartbeat enqueue failed"),
        }
        tick += 1;
    }

    info!(produced = tick, "Heartbeat producer stopped");
}
