//! Main Loop and Lifecycle Controller (§4.6, §4.7): the `Scheduler` wires the catalog, storage,
//! process launcher, and clock together and drives the wakeup/scan/launch/sleep cycle as a
//! single background task. That task is the sole owner of the execution table (§5) — `start`,
//! `stop`, and `resume` only ever talk to it over a control channel, never touch it directly.
//! The task itself never exits once spawned: `stop()` pauses it in place (so a completion that
//! arrives after the grace period is still observed and finalized, and a retried `stop()` sees
//! an accurate count) and `resume()` un-pauses it without reloading the catalog (§4.7).

use crate::catalog::ScheduleCatalog;
use crate::clock::SchedulerClock;
use crate::errors::SchedulerError;
use crate::execution::ExecutionTable;
use crate::launcher;
use crate::planner;
use crate::process::ProcessLauncher;
use crate::storage::StorageAdapter;
use crate::watcher::CompletionEvent;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex};

enum Control {
    Stop { reply: oneshot::Sender<i64> },
    Resume,
}

struct RunningHandle {
    control_tx: mpsc::UnboundedSender<Control>,
}

/// Owns the scheduling core's dependencies and coordinates `start`/`stop`/`resume` against the
/// background main-loop task.
pub struct Scheduler {
    storage: Arc<dyn StorageAdapter>,
    process_launcher: Arc<dyn ProcessLauncher>,
    clock: Arc<dyn SchedulerClock>,
    grace_period: Duration,
    running: Mutex<Option<RunningHandle>>,
}

impl Scheduler {
    pub fn new(
        storage: Arc<dyn StorageAdapter>,
        process_launcher: Arc<dyn ProcessLauncher>,
        clock: Arc<dyn SchedulerClock>,
        grace_period: Duration,
    ) -> Self {
        Self {
            storage,
            process_launcher,
            clock,
            grace_period,
            running: Mutex::new(None),
        }
    }

    /// Loads the catalog, plans each schedule's first firing, and spawns the main loop as a
    /// background task. Returns immediately (§4.7). Refuses if the main loop is already alive,
    /// including while it is paused — `resume()`, not a second `start()`, is how a paused
    /// scheduler is re-enabled.
    pub async fn start(&self) -> Result<(), SchedulerError> {
        let mut guard = self.running.lock().await;
        if guard.is_some() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let catalog = Arc::new(ScheduleCatalog::load(self.storage.as_ref()).await?);
        let (control_tx, control_rx) = mpsc::unbounded_channel();

        tokio::spawn(run_main_loop(
            catalog,
            Arc::clone(&self.storage),
            Arc::clone(&self.process_launcher),
            Arc::clone(&self.clock),
            self.grace_period,
            control_rx,
        ));

        *guard = Some(RunningHandle { control_tx });
        Ok(())
    }

    /// Requests the main loop stop scheduling, signals every live task to terminate, and waits
    /// the configured grace period before checking whether any task is still running (§4.7). A
    /// no-op if the scheduler was never started.
    ///
    /// The main loop does not exit on `Stop` — it pauses in place and keeps listening for
    /// completions, so a task that exits after the grace period is still accounted for and
    /// finalized, and a retried `stop()` reports an accurate, non-stale `remaining` count rather
    /// than a `guard.take()`-induced false success.
    pub async fn stop(&self) -> Result<(), SchedulerError> {
        let guard = self.running.lock().await;
        let Some(running) = guard.as_ref() else {
            return Ok(());
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        if running.control_tx.send(Control::Stop { reply: reply_tx }).is_err() {
            return Ok(());
        }

        let remaining = reply_rx.await.unwrap_or(0);
        if remaining > 0 {
            return Err(SchedulerError::StopTimeout { remaining });
        }
        Ok(())
    }

    /// Clears the paused flag set by `stop()`, letting the main loop resume scheduling without
    /// reloading the catalog or replanning from scratch (§4.7). A no-op if never started.
    pub async fn resume(&self) -> Result<(), SchedulerError> {
        let guard = self.running.lock().await;
        if let Some(running) = guard.as_ref() {
            let _ = running.control_tx.send(Control::Resume);
        }
        Ok(())
    }
}

async fn run_main_loop(
    catalog: Arc<ScheduleCatalog>,
    storage: Arc<dyn StorageAdapter>,
    process_launcher: Arc<dyn ProcessLauncher>,
    clock: Arc<dyn SchedulerClock>,
    grace_period: Duration,
    mut control_rx: mpsc::UnboundedReceiver<Control>,
) {
    let mut table = ExecutionTable::default();
    let (completion_tx, mut completion_rx) = mpsc::unbounded_channel::<CompletionEvent>();
    let mut paused = false;

    let start_time = clock.now().await;
    for schedule in catalog.schedules() {
        if let Some(next) = planner::plan_first(&schedule, start_time) {
            table.get_or_insert(schedule.id).next_start_time = Some(next);
        }
    }

    loop {
        let least = if paused {
            None
        } else {
            check_schedules(
                &catalog,
                &storage,
                &process_launcher,
                &clock,
                &mut table,
                &completion_tx,
            )
            .await
        };

        let sleep_target = match least {
            Some(t) => t,
            None => clock.now().await + Duration::from_secs(24 * 3600),
        };

        tokio::select! {
            _ = clock.idle_to(sleep_target), if !paused => {}
            Some(event) = completion_rx.recv() => {
                handle_completion(&mut table, &catalog, &storage, &clock, paused, event).await;
            }
            Some(msg) = control_rx.recv() => {
                match msg {
                    Control::Stop { reply } => {
                        paused = true;
                        table.terminate_all();
                        tokio::time::sleep(grace_period).await;
                        while let Ok(event) = completion_rx.try_recv() {
                            handle_completion(&mut table, &catalog, &storage, &clock, true, event).await;
                        }
                        let _ = reply.send(table.active_task_count());
                    }
                    Control::Resume => {
                        paused = false;
                    }
                }
            }
        }
    }
}

/// One pass over every schedule with a pending firing (§4.6 step 1): launches those due, and
/// returns the earliest still-pending `next_start_time` so the caller knows how long it may
/// safely sleep.
async fn check_schedules(
    catalog: &ScheduleCatalog,
    storage: &Arc<dyn StorageAdapter>,
    process_launcher: &Arc<dyn ProcessLauncher>,
    clock: &Arc<dyn SchedulerClock>,
    table: &mut ExecutionTable,
    completions: &mpsc::UnboundedSender<CompletionEvent>,
) -> Option<std::time::SystemTime> {
    let mut least: Option<std::time::SystemTime> = None;
    let now = clock.now().await;

    for schedule_id in table.snapshot_keys() {
        let Some(schedule) = catalog.schedule(&schedule_id) else {
            tracing::warn!(schedule_id = %schedule_id, "schedule vanished from catalog mid-pass");
            continue;
        };

        let (exclusive_busy, next_start_time) = match table.get(&schedule_id) {
            Some(exec) => (
                schedule.exclusive && !exec.task_processes.is_empty(),
                exec.next_start_time,
            ),
            None => continue,
        };

        if exclusive_busy {
            continue;
        }

        let Some(next_start_time) = next_start_time else {
            continue;
        };

        if now < next_start_time {
            least = Some(least.map_or(next_start_time, |l| l.min(next_start_time)));
            continue;
        }

        // Pre-increment before the launch's suspension points, so a completion racing this
        // launch never observes a transient undercount (§4.6, §5).
        table.increment_active();

        if !schedule.exclusive {
            let next = planner::plan_next(&schedule, next_start_time, now, false);
            if let Some(exec) = table.get_mut(&schedule_id) {
                exec.next_start_time = next;
            }
            if let Some(t) = next {
                least = Some(least.map_or(t, |l| l.min(t)));
            }
        }
        // Exclusive schedules keep their current `next_start_time` (the firing that just
        // triggered) until their completion watcher reports in; the busy check above, not a
        // cleared `next_start_time`, is what prevents a second launch meanwhile.

        let Some(argv) = catalog.argv(&schedule.process_name) else {
            let err = SchedulerError::MissingCatalogEntry {
                process_name: schedule.process_name.clone(),
            };
            tracing::warn!(schedule = %schedule.name, error = %err, "skipping this firing");
            table.decrement_active();
            continue;
        };

        match launcher::launch(
            &schedule,
            &argv,
            process_launcher,
            storage,
            clock,
            completions.clone(),
        )
        .await
        {
            Ok(launched) => {
                table
                    .get_or_insert(schedule_id)
                    .task_processes
                    .insert(launched.task_id, launched.running);
            }
            Err(e) => {
                tracing::error!(schedule = %schedule.name, error = %e, "spawn failed");
                table.decrement_active();
            }
        }
    }

    least
}

/// Applies a watcher's report (§4.5): decrements the active count, re-plans exclusive
/// schedules off the firing that just completed, drops idle executions, then persists the
/// `COMPLETE` row last (§9 accounting-before-persistence ordering).
async fn handle_completion(
    table: &mut ExecutionTable,
    catalog: &ScheduleCatalog,
    storage: &Arc<dyn StorageAdapter>,
    clock: &Arc<dyn SchedulerClock>,
    paused: bool,
    event: CompletionEvent,
) {
    table.decrement_active();

    if let Some(schedule) = catalog.schedule(&event.schedule_id) {
        if schedule.exclusive {
            let fired_at = table.get(&event.schedule_id).and_then(|e| e.next_start_time);
            if let Some(fired_at) = fired_at {
                let now = clock.now().await;
                let next = planner::plan_next(&schedule, fired_at, now, paused);
                if let Some(exec) = table.get_mut(&event.schedule_id) {
                    exec.next_start_time = next;
                }
            }
        }
    }

    if let Some(exec) = table.get_mut(&event.schedule_id) {
        exec.task_processes.remove(&event.task_id);
    }

    if table
        .get(&event.schedule_id)
        .map(|exec| exec.is_idle())
        .unwrap_or(false)
    {
        table.remove(&event.schedule_id);
    }

    if event.persist {
        let end_time = chrono::Utc::now();
        if let Err(e) = storage
            .update_task_on_complete(event.task_id, event.exit_code, end_time)
            .await
        {
            tracing::error!(task_id = %event.task_id, error = %e, "failed to persist COMPLETE task row");
        }
    }
}
