//! Execution Table (§3.1/§3.2): per-schedule mutable state — when it next fires, and which
//! tasks it currently has running. Owned exclusively by the Scheduler's main-loop task; nothing
//! outside that task ever touches it, so none of these types need internal locking (§5).

use std::collections::HashMap;
use std::time::SystemTime;
use tokio::sync::oneshot;
use uuid::Uuid;

/// A live child process recorded against its owning schedule. The process handle itself is
/// owned by the task's completion watcher, not here — this only keeps what the main loop needs
/// to account for and, on `stop()`, terminate it.
pub struct RunningTask {
    pub pid: u32,
    terminate_tx: Option<oneshot::Sender<()>>,
}

impl RunningTask {
    pub fn new(pid: u32, terminate_tx: oneshot::Sender<()>) -> Self {
        Self {
            pid,
            terminate_tx: Some(terminate_tx),
        }
    }

    /// Asks the owning watcher to terminate its process. A no-op if already requested.
    pub fn terminate(&mut self) {
        if let Some(tx) = self.terminate_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Per-schedule state (§3.1 `ScheduleExecution`): the next fire time, if any, and the tasks
/// currently running for this schedule.
#[derive(Default)]
pub struct ScheduleExecution {
    pub next_start_time: Option<SystemTime>,
    pub task_processes: HashMap<Uuid, RunningTask>,
}

impl ScheduleExecution {
    /// No future firing planned and nothing running — safe to drop from the table (§4.5).
    pub fn is_idle(&self) -> bool {
        self.next_start_time.is_none() && self.task_processes.is_empty()
    }
}

/// All `ScheduleExecution`s plus the scheduler-wide active task counter (§3.2, §5).
#[derive(Default)]
pub struct ExecutionTable {
    executions: HashMap<Uuid, ScheduleExecution>,
    active_task_count: i64,
}

impl ExecutionTable {
    pub fn get_or_insert(&mut self, schedule_id: Uuid) -> &mut ScheduleExecution {
        self.executions.entry(schedule_id).or_default()
    }

    pub fn get(&self, schedule_id: &Uuid) -> Option<&ScheduleExecution> {
        self.executions.get(schedule_id)
    }

    pub fn get_mut(&mut self, schedule_id: &Uuid) -> Option<&mut ScheduleExecution> {
        self.executions.get_mut(schedule_id)
    }

    pub fn remove(&mut self, schedule_id: &Uuid) {
        self.executions.remove(schedule_id);
    }

    /// Snapshot of current keys. Taken before iterating, since handling a completion can
    /// insert/remove entries mid-pass (§4.6 reentrancy).
    pub fn snapshot_keys(&self) -> Vec<Uuid> {
        self.executions.keys().copied().collect()
    }

    pub fn active_task_count(&self) -> i64 {
        self.active_task_count
    }

    /// Pre-increments the active count before a schedule's launch-related suspension points
    /// (§4.6), so a completion racing the launch never observes a transient undercount.
    pub fn increment_active(&mut self) {
        self.active_task_count += 1;
    }

    /// Decrements the active count, never going negative (§9: resolved in favor of a saturating
    /// guard rather than propagating an underflow).
    pub fn decrement_active(&mut self) {
        if self.active_task_count > 0 {
            self.active_task_count -= 1;
        } else {
            tracing::error!("active task count underflow; ignoring decrement");
        }
    }

    pub fn terminate_all(&mut self) {
        for exec in self.executions.values_mut() {
            for task in exec.task_processes.values_mut() {
                task.terminate();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrementing_past_zero_does_not_go_negative() {
        let mut table = ExecutionTable::default();
        table.decrement_active();
        assert_eq!(table.active_task_count(), 0);
    }

    #[test]
    fn increment_then_decrement_round_trips() {
        let mut table = ExecutionTable::default();
        table.increment_active();
        table.increment_active();
        table.decrement_active();
        assert_eq!(table.active_task_count(), 1);
    }

    #[test]
    fn idle_execution_has_no_next_start_time_and_no_tasks() {
        let exec = ScheduleExecution::default();
        assert!(exec.is_idle());
    }
}
