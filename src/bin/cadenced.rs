//! Service entry point (§10.4): wires configuration, logging, storage, and the `Scheduler`
//! together, then forwards OS shutdown signals into `stop()`. This binary is the only place
//! that touches signal handling or `std::process::exit` — the library crate exposes none of it.

use cadence_scheduler::clock::SystemClock;
use cadence_scheduler::config::SchedulerConfig;
use cadence_scheduler::errors::SchedulerError;
use cadence_scheduler::logging;
use cadence_scheduler::process::TokioProcessLauncher;
use cadence_scheduler::scheduler::Scheduler;
use cadence_scheduler::storage::sqlite::SqliteStorageAdapter;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = SchedulerConfig::load()?;
    logging::init(&config)?;

    let storage = Arc::new(
        SqliteStorageAdapter::connect(&config.database_path.to_string_lossy()).await?,
    );
    let scheduler = Scheduler::new(
        storage,
        Arc::new(TokioProcessLauncher),
        Arc::new(SystemClock),
        config.stop_grace_period,
    );

    scheduler.start().await?;
    tracing::info!("scheduler started");

    wait_for_shutdown_signal().await;
    tracing::info!("shutdown signal received, draining running tasks");

    if let Err(e) = scheduler.stop().await {
        if matches!(e, SchedulerError::StopTimeout { .. }) {
            tracing::warn!(error = %e, "stop timed out, retrying once after the grace period");
            if let Err(e) = scheduler.stop().await {
                tracing::error!(error = %e, "stop failed after retry, exiting anyway");
                std::process::exit(1);
            }
        } else {
            return Err(e.into());
        }
    }

    tracing::info!("scheduler stopped cleanly");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = terminate.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
