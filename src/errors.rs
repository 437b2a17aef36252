use thiserror::Error;

/// [`SchedulerError`] is the unified error type returned by every fallible entry point of the
/// scheduling core, it uses [`thiserror`] under the hood so that each variant renders a stable,
/// greppable message
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// Returned by [`crate::scheduler::Scheduler::start`] when the scheduler is already running
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// Returned by [`crate::scheduler::Scheduler::stop`] when tasks did not drain within the
    /// configured grace period; the caller may retry
    #[error("stop timed out waiting for {remaining} task(s) to exit")]
    StopTimeout {
        /// Number of tasks still running when the grace period elapsed
        remaining: i64,
    },

    /// A child process failed to spawn for the named schedule
    #[error("failed to spawn process for schedule '{schedule}': {source}")]
    SpawnFailure {
        /// Human label of the schedule whose process failed to launch
        schedule: String,
        /// Underlying OS error
        #[source]
        source: std::io::Error,
    },

    /// A schedule referenced a `process_name` absent from the `scheduled_processes` catalog
    #[error("references unknown process '{process_name}'")]
    MissingCatalogEntry {
        /// The process name that could not be resolved
        process_name: String,
    },

    /// The storage adapter failed while reading or writing a row; storage read failures during
    /// catalog bootstrap are fatal, failures during task insert/update are logged and swallowed
    #[error("storage operation failed: {0}")]
    StorageFailure(#[from] sqlx::Error),

    /// Configuration could not be loaded or was missing a required field
    #[error("configuration error: {0}")]
    ConfigError(String),
}
