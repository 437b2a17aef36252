//! Test doubles shared by the end-to-end scheduler tests (§10.5): an in-memory
//! `StorageAdapter` and a couple of deterministic `ProcessLauncher`s, standing in for a real
//! SQLite database and real child processes.

use async_trait::async_trait;
use cadence_scheduler::errors::SchedulerError;
use cadence_scheduler::model::{Schedule, ScheduledProcess, TaskRow};
use cadence_scheduler::process::{ProcessHandle, ProcessLauncher};
use cadence_scheduler::storage::StorageAdapter;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
pub struct MemoryStorage {
    processes: Vec<ScheduledProcess>,
    schedules: Vec<Schedule>,
    pub inserted: Mutex<Vec<TaskRow>>,
    pub completed: Mutex<Vec<(Uuid, Option<i32>)>>,
}

impl MemoryStorage {
    pub fn new(processes: Vec<ScheduledProcess>, schedules: Vec<Schedule>) -> Self {
        Self {
            processes,
            schedules,
            inserted: Mutex::new(Vec::new()),
            completed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl StorageAdapter for MemoryStorage {
    async fn query_scheduled_processes(&self) -> Result<Vec<ScheduledProcess>, SchedulerError> {
        Ok(self.processes.clone())
    }

    async fn query_schedules(&self) -> Result<Vec<Schedule>, SchedulerError> {
        Ok(self.schedules.clone())
    }

    async fn insert_task(&self, row: &TaskRow) -> Result<(), SchedulerError> {
        self.inserted.lock().unwrap().push(row.clone());
        Ok(())
    }

    async fn update_task_on_complete(
        &self,
        id: Uuid,
        exit_code: Option<i32>,
        _end_time: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        self.completed.lock().unwrap().push((id, exit_code));
        Ok(())
    }
}

/// A process handle that exits with code 0 as soon as it is awaited.
struct InstantHandle {
    pid: u32,
}

#[async_trait]
impl ProcessHandle for InstantHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait(&mut self) -> Option<i32> {
        Some(0)
    }

    async fn terminate(&mut self) {}
}

/// Spawns processes that complete the instant they are waited on.
#[derive(Default)]
pub struct InstantLauncher {
    next_pid: AtomicU32,
}

#[async_trait]
impl ProcessLauncher for InstantLauncher {
    async fn spawn(&self, _argv: &[String]) -> std::io::Result<Box<dyn ProcessHandle>> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(InstantHandle { pid }))
    }
}

/// A process handle that only exits once `terminate` has been called, polling a shared flag.
struct CooperativeHandle {
    pid: u32,
    terminated: std::sync::Arc<AtomicBool>,
}

#[async_trait]
impl ProcessHandle for CooperativeHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait(&mut self) -> Option<i32> {
        while !self.terminated.load(Ordering::SeqCst) {
            tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        }
        Some(143)
    }

    async fn terminate(&mut self) {
        self.terminated.store(true, Ordering::SeqCst);
    }
}

/// Spawns processes that run until `terminate` is called on their handle — used to exercise
/// `stop()`'s drain path.
#[derive(Default)]
pub struct CooperativeLauncher {
    next_pid: AtomicU32,
}

#[async_trait]
impl ProcessLauncher for CooperativeLauncher {
    async fn spawn(&self, _argv: &[String]) -> std::io::Result<Box<dyn ProcessHandle>> {
        let pid = self.next_pid.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(Box::new(CooperativeHandle {
            pid,
            terminated: std::sync::Arc::new(AtomicBool::new(false)),
        }))
    }
}

/// A process handle that ignores `terminate` entirely — used to exercise `StopTimeout`.
struct StubbornHandle {
    pid: u32,
}

#[async_trait]
impl ProcessHandle for StubbornHandle {
    fn pid(&self) -> u32 {
        self.pid
    }

    async fn wait(&mut self) -> Option<i32> {
        std::future::pending::<()>().await;
        unreachable!()
    }

    async fn terminate(&mut self) {}
}

#[derive(Default)]
pub struct StubbornLauncher;

#[async_trait]
impl ProcessLauncher for StubbornLauncher {
    async fn spawn(&self, _argv: &[String]) -> std::io::Result<Box<dyn ProcessHandle>> {
        Ok(Box::new(StubbornHandle { pid: 1 }))
    }
}
