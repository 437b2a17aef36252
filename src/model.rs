//! Catalog and task row types shared by the storage adapter, the planner, and the scheduler.

use chrono::NaiveTime;
use std::time::Duration;
use uuid::Uuid;

/// Discriminant for [`Schedule::kind`]. Numeric values are part of the persisted contract
/// (`schedules.schedule_type`) and must not be renumbered
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScheduleType {
    /// Wall-clock time of day, optionally restricted to a weekday
    Timed = 1,
    /// Fixed interval from the previous firing
    Interval = 2,
    /// Never fires from the main loop; triggered externally
    Manual = 3,
    /// Fires once, immediately, on the first tick after `start()`
    Startup = 4,
}

impl ScheduleType {
    /// Maps a persisted `schedule_type` code back to its variant
    pub fn from_code(code: i16) -> Option<Self> {
        match code {
            1 => Some(Self::Timed),
            2 => Some(Self::Interval),
            3 => Some(Self::Manual),
            4 => Some(Self::Startup),
            _ => None,
        }
    }

    /// The persisted `schedule_type` code for this variant
    pub fn code(self) -> i16 {
        self as i16
    }
}

/// Discriminant for [`TaskRow::state`]. Numeric values are part of the persisted contract
/// (`tasks.state`) and must not be renumbered
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// The task's process has been spawned and has not yet exited
    Running = 1,
    /// The process exited and the row has been finalized
    Complete = 2,
    /// The task was canceled before or during execution
    Canceled = 3,
    /// The scheduler was stopped while the task was running
    Interrupted = 4,
}

impl TaskState {
    /// The persisted `state` code for this variant
    pub fn code(self) -> i32 {
        self as i32
    }
}

/// A catalog row describing when and how often a process should run. Immutable for the
/// lifetime of a scheduler run; loaded once at `start()` from `schedules`
#[derive(Debug, Clone)]
pub struct Schedule {
    /// Unique catalog identifier
    pub id: Uuid,
    /// Short human label
    pub name: String,
    /// Key into the [`ScheduledProcess`] catalog
    pub process_name: String,
    /// Temporal policy
    pub kind: ScheduleType,
    /// Time-of-day; meaningful for [`ScheduleType::Timed`]
    pub time: Option<NaiveTime>,
    /// ISO weekday 1 (Monday) through 7 (Sunday); meaningful for [`ScheduleType::Timed`].
    /// Absent means "any day"
    pub day: Option<u8>,
    /// Repeat interval; meaningful for [`ScheduleType::Interval`] and for
    /// [`ScheduleType::Timed`] repeats. Absent means "no repeat" (one-shot)
    pub repeat: Option<Duration>,
    /// When true, at most one task for this schedule may run concurrently
    pub exclusive: bool,
}

impl Schedule {
    /// `repeat` expressed as whole seconds, the form the planner's arithmetic uses
    pub fn repeat_seconds(&self) -> Option<u64> {
        self.repeat.map(|d| d.as_secs())
    }
}

/// A catalog row mapping a process name to its argv. Immutable for the lifetime of a
/// scheduler run; loaded once at `start()` from `scheduled_processes`
#[derive(Debug, Clone)]
pub struct ScheduledProcess {
    /// Key referenced by [`Schedule::process_name`]
    pub name: String,
    /// Command + arguments used to spawn the child; never empty for a well-formed row
    pub argv: Vec<String>,
}

/// A row in the `tasks` table, one per non-STARTUP task launch
#[derive(Debug, Clone)]
pub struct TaskRow {
    /// Fresh id generated at launch
    pub id: Uuid,
    /// Copied from the owning [`Schedule::process_name`]
    pub process_name: String,
    /// Current lifecycle state
    pub state: TaskState,
    /// When the process was spawned
    pub start_time: chrono::DateTime<chrono::Utc>,
    /// When the process exited; absent while running
    pub end_time: Option<chrono::DateTime<chrono::Utc>>,
    /// OS process id
    pub pid: u32,
    /// Process exit code; absent if the wait failed
    pub exit_code: Option<i32>,
    /// Free-text annotation, e.g. populated on cancel/interrupt
    pub reason: Option<String>,
}
