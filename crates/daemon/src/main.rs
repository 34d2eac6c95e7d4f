//! Job Engine - Demo Daemon Entry Point
//! Scheduler + worker pool over the in-memory store, fed by a heartbeat producer

mod config;
mod demo;
mod telemetry;

use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::sync::watch;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::{Layered, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

use config::{DaemonConfig, LogConfig, LogFormat};
use jobengine_core::{Scheduler, VERSION};
use jobengine_infra_memory::MemoryJobStore;
use telemetry::{BoxedLayer, Telemetry};

const DEFAULT_LOG_FILTER: &str = "jobengine=info";
const LOG_FILE_PREFIX: &str = "jobengine.log";

type BaseSubscriber = Layered<EnvFilter, Registry>;

/// Handles that must outlive the subscriber
struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
    telemetry: Option<Telemetry>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // 1. Configuration, then logging (config errors go to stderr)
    let cfg = DaemonConfig::load()?;
    let logging = init_logging(&cfg.log)?;

    info!("Job Engine v{} starting...", VERSION);
    if let Some(telemetry) = &logging.telemetry {
        info!(
            service_name = %telemetry.service_name,
            endpoint = %telemetry.endpoint,
            "OpenTelemetry initialized"
        );
    }

    // 2. Scheduler over the in-memory store (DI wiring)
    let store = Arc::new(MemoryJobStore::new());
    let scheduler = Arc::new(Scheduler::with_system_clock(store));

    // 3. Handlers
    demo::register_handlers(&scheduler, cfg.demo.failure_rate)?;
    info!(handlers = ?scheduler.registry().names(), "Handlers registered");

    // 4. Worker pool
    scheduler.start_worker(cfg.worker.clone()).await?;

    // 5. Heartbeat producer
    let (stop_tx, stop_rx) = watch::channel(false);
    let producer = tokio::spawn(demo::run_producer(
        Arc::clone(&scheduler),
        cfg.demo.clone(),
        cfg.retry.clone(),
        stop_rx,
    ));

    info!("System ready. Press Ctrl+C to shutdown");
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl+C")?;
    info!("Shutdown signal received. Draining...");

    // 6. Graceful shutdown: producer first, then drain in-flight jobs
    stop_tx.send_replace(true);
    if let Err(e) = producer.await {
        warn!(error = %e, "Heartbeat producer ended abnormally");
    }
    scheduler.stop_worker().await?;

    let queue = scheduler.queue_stats().await?;
    let worker = scheduler.worker_stats();
    info!(
        pending = queue.pending,
        dead_letters = queue.dead,
        dispatched = worker.dispatched,
        succeeded = worker.succeeded,
        failed = worker.failed,
        retried = worker.retried,
        dead_lettered = worker.dead_lettered,
        unroutable = worker.unroutable,
        "Final stats"
    );

    info!("Shutdown complete.");
    if let Some(telemetry) = logging.telemetry {
        telemetry.shutdown();
    }
    Ok(())
}

/// Install the global subscriber: console (pretty or JSON), optional daily
/// file, optional OTLP export. Filter from `RUST_LOG`.
fn init_logging(log: &LogConfig) -> Result<LoggingGuard> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(DEFAULT_LOG_FILTER))
        .context("failed to create env filter")?;

    let mut layers: Vec<BoxedLayer<BaseSubscriber>> = Vec::new();
    layers.push(match log.format {
        // Production: JSON structured logging
        LogFormat::Json => fmt::layer().json().boxed(),
        // Development: Pretty formatting with colors
        LogFormat::Pretty => fmt::layer().pretty().boxed(),
    });

    let mut file_guard = None;
    if let Some(directory) = &log.directory {
        let directory = shellexpand::tilde(directory).into_owned();
        let appender = tracing_appender::rolling::daily(&directory, LOG_FILE_PREFIX);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        layers.push(fmt::layer().json().with_writer(writer).with_ansi(false).boxed());
        file_guard = Some(guard);
    }

    let (otel, telemetry_error) = match telemetry::otlp_layer::<BaseSubscriber>() {
        Ok(built) => (built, None),
        Err(e) => (None, Some(e)),
    };
    let telemetry = otel.map(|(layer, telemetry)| {
        layers.push(layer);
        telemetry
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(layers)
        .try_init()
        .context("failed to install tracing subscriber")?;

    if let Some(e) = telemetry_error {
        warn!(error = %e, "OpenTelemetry not initialized (continuing without it)");
    }

    Ok(LoggingGuard {
        _file_guard: file_guard,
        telemetry,
    })
}
