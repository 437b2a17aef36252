//! Completion Watcher (§4.5): one of these runs per live task, racing the process's exit
//! against an external termination request. It never touches the execution table or storage
//! directly — it only knows how to reach the one process it owns. Accounting, in-memory
//! cleanup, and persistence are all performed by the Scheduler's main-loop task upon receiving
//! the [`CompletionEvent`] this watcher reports, which is what keeps the ordering guarantee in
//! §4.5 ("accounting and in-memory cleanup happen before the DB update") true even though the
//! watcher and the main loop run as separate tasks.

use crate::process::ProcessHandle;
use tokio::sync::{mpsc, oneshot};
use uuid::Uuid;

/// Reported by a watcher to the main loop when its task's process exits.
pub struct CompletionEvent {
    pub schedule_id: Uuid,
    pub task_id: Uuid,
    pub exit_code: Option<i32>,
    /// Whether the `tasks` row should be finalized (false for STARTUP tasks, §3.2).
    pub persist: bool,
}

/// Awaits `handle`'s exit (or a termination request, in which case it signals the process and
/// then awaits exit anyway), logs the outcome, and reports a [`CompletionEvent`]. Never
/// propagates a wait failure — it is swallowed and reported as an absent exit code (§7
/// WaitFailure).
pub async fn run(
    schedule_id: Uuid,
    task_id: Uuid,
    mut handle: Box<dyn ProcessHandle>,
    mut terminate_rx: oneshot::Receiver<()>,
    persist: bool,
    completions: mpsc::UnboundedSender<CompletionEvent>,
) {
    let pid = handle.pid();

    let exit_code = tokio::select! {
        code = handle.wait() => code,
        _ = &mut terminate_rx => {
            handle.terminate().await;
            handle.wait().await
        }
    };

    tracing::info!(task_id = %task_id, pid, exit_code = ?exit_code, "task exited");

    let _ = completions.send(CompletionEvent {
        schedule_id,
        task_id,
        exit_code,
        persist,
    });
}
