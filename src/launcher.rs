//! Task Launcher (§4.4): resolves a schedule to an argv, spawns its process, persists its
//! `RUNNING` row, and attaches a completion watcher. Always called from the main-loop task, so
//! the `storage.insert_task` await below is the only suspension point between pre-incrementing
//! the active count (the caller's job, before calling this) and the task actually being
//! recorded in the execution table.

use crate::clock::SchedulerClock;
use crate::errors::SchedulerError;
use crate::execution::RunningTask;
use crate::model::{Schedule, ScheduleType, TaskRow, TaskState};
use crate::process::ProcessLauncher;
use crate::storage::StorageAdapter;
use crate::watcher::{self, CompletionEvent};
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// A successful launch: the fresh task id and the entry to record in the execution table.
pub struct Launched {
    pub task_id: Uuid,
    pub running: RunningTask,
}

/// Spawns `argv` for `schedule`, persists its `RUNNING` row (skipped for STARTUP schedules,
/// §3.2), and spawns a detached completion watcher that reports back over `completions`. On
/// spawn failure, returns before touching storage or spawning anything — callers roll back
/// their own pre-incremented active count (§7 `SpawnFailure`).
pub async fn launch(
    schedule: &Schedule,
    argv: &[String],
    process_launcher: &Arc<dyn ProcessLauncher>,
    storage: &Arc<dyn StorageAdapter>,
    clock: &Arc<dyn SchedulerClock>,
    completions: mpsc::UnboundedSender<CompletionEvent>,
) -> Result<Launched, SchedulerError> {
    let task_id = Uuid::new_v4();

    let handle = process_launcher
        .spawn(argv)
        .await
        .map_err(|source| SchedulerError::SpawnFailure {
            schedule: schedule.name.clone(),
            source,
        })?;

    let pid = handle.pid();
    let persist = !matches!(schedule.kind, ScheduleType::Startup);

    if persist {
        let start_time = chrono::DateTime::<chrono::Utc>::from(clock.now().await);
        let row = TaskRow {
            id: task_id,
            process_name: schedule.process_name.clone(),
            state: TaskState::Running,
            start_time,
            end_time: None,
            pid,
            exit_code: None,
            reason: None,
        };

        if let Err(e) = storage.insert_task(&row).await {
            tracing::error!(task_id = %task_id, error = %e, "failed to persist RUNNING task row");
        }
    }

    let (terminate_tx, terminate_rx) = oneshot::channel();

    tokio::spawn(watcher::run(
        schedule.id,
        task_id,
        handle,
        terminate_rx,
        persist,
        completions,
    ));

    Ok(Launched {
        task_id,
        running: RunningTask::new(pid, terminate_tx),
    })
}
