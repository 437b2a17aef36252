//! Structured logging setup. The scheduling core never calls `tracing_subscriber` directly —
//! only the binary entry point initializes a subscriber, via [`init`].

use crate::config::{LogFormat, SchedulerConfig};
use crate::errors::SchedulerError;
use tracing_subscriber::EnvFilter;

/// Initializes the global `tracing` subscriber from `config`. Must be called once, before any
/// [`crate::scheduler::Scheduler`] is constructed. `RUST_LOG` overrides `config.log_level` when
/// set, matching `tracing_subscriber`'s usual convention.
pub fn init(config: &SchedulerConfig) -> Result<(), SchedulerError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone()));

    match config.log_format {
        LogFormat::Json => {
            tracing_subscriber::fmt()
                .json()
                .with_env_filter(filter)
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::fmt()
                .pretty()
                .with_env_filter(filter)
                .init();
        }
    }

    tracing::info!(level = %config.log_level, format = ?config.log_format, "logging initialized");
    Ok(())
}
