//! Storage Adapter (§4.9/§6.1): the narrow interface the scheduling core uses to read the
//! catalog and record task lifecycle rows. The core depends only on this trait; [`sqlite`]
//! is the concrete implementation this crate ships.

pub mod sqlite;

use crate::errors::SchedulerError;
use crate::model::{Schedule, ScheduledProcess, TaskRow};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Read/write contract between the scheduling core and a relational backend. Implementors
/// own their own connection pooling; the core acquires no long-lived session (§5 resource
/// ownership).
#[async_trait]
pub trait StorageAdapter: Send + Sync {
    /// Reads the full `scheduled_processes` table. Called once, at catalog bootstrap.
    async fn query_scheduled_processes(&self) -> Result<Vec<ScheduledProcess>, SchedulerError>;

    /// Reads the full `schedules` table. Called once, at catalog bootstrap.
    async fn query_schedules(&self) -> Result<Vec<Schedule>, SchedulerError>;

    /// Inserts a `RUNNING` row for a freshly launched, non-STARTUP task.
    async fn insert_task(&self, row: &TaskRow) -> Result<(), SchedulerError>;

    /// Finalizes a task row to `COMPLETE` with its exit code and end time.
    async fn update_task_on_complete(
        &self,
        id: Uuid,
        exit_code: Option<i32>,
        end_time: DateTime<Utc>,
    ) -> Result<(), SchedulerError>;
}
