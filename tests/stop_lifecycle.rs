//! (S5) Stop with one live task: a task that exits once terminated lets `stop()` return
//! success within the grace period; a task that never exits surfaces `StopTimeout`.

mod support;

use cadence_scheduler::clock::SystemClock;
use cadence_scheduler::errors::SchedulerError;
use cadence_scheduler::model::{Schedule, ScheduledProcess, ScheduleType};
use cadence_scheduler::scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use support::{CooperativeLauncher, InstantLauncher, MemoryStorage, StubbornLauncher};
use uuid::Uuid;

fn manual_noop_schedule() -> (Schedule, ScheduledProcess) {
    (
        Schedule {
            id: Uuid::new_v4(),
            name: "long-runner".into(),
            process_name: "noop".into(),
            kind: ScheduleType::Startup,
            time: None,
            day: None,
            repeat: None,
            exclusive: false,
        },
        ScheduledProcess {
            name: "noop".into(),
            argv: vec!["sleep".into(), "infinity".into()],
        },
    )
}

#[tokio::test(start_paused = true)]
async fn stop_succeeds_once_the_terminated_task_exits_within_the_grace_period() {
    let (schedule, process) = manual_noop_schedule();
    let storage = Arc::new(MemoryStorage::new(vec![process], vec![schedule]));

    let scheduler = Scheduler::new(
        Arc::clone(&storage) as _,
        Arc::new(CooperativeLauncher::default()),
        Arc::new(SystemClock),
        Duration::from_millis(200),
    );

    scheduler.start().await.unwrap();
    tokio::time::advance(Duration::from_millis(10)).await;
    tokio::task::yield_now().await;

    let result = scheduler.stop().await;
    assert!(result.is_ok(), "expected stop to succeed, got {result:?}");
}

#[tokio::test(start_paused = true)]
async fn stop_reports_timeout_when_a_task_ignores_termination() {
    let (schedule, process) = manual_noop_schedule();
    let storage = Arc::new(MemoryStorage::new(vec![process], vec![schedule]));

    let scheduler = Scheduler::new(
        Arc::clone(&storage) as _,
        Arc::new(StubbornLauncher),
        Arc::new(SystemClock),
        Duration::from_millis(50),
    );

    scheduler.start().await.unwrap();
    tokio::time::advance(Duration::from_millis(10)).await;
    tokio::task::yield_now().await;

    let result = scheduler.stop().await;
    assert!(matches!(result, Err(SchedulerError::StopTimeout { remaining: 1 })));
}

#[tokio::test(start_paused = true)]
async fn resume_re_enables_scheduling_on_the_same_main_loop_without_restarting() {
    // (§4.7) "`_paused` can be cleared externally to re-enable scheduling without restarting."
    let schedule = Schedule {
        id: Uuid::new_v4(),
        name: "poller".into(),
        process_name: "noop".into(),
        kind: ScheduleType::Interval,
        time: None,
        day: None,
        repeat: Some(Duration::from_millis(50)),
        exclusive: false,
    };

    let storage = Arc::new(MemoryStorage::new(
        vec![ScheduledProcess {
            name: "noop".into(),
            argv: vec!["true".into()],
        }],
        vec![schedule],
    ));

    let scheduler = Scheduler::new(
        Arc::clone(&storage) as _,
        Arc::new(InstantLauncher::default()),
        Arc::new(SystemClock),
        Duration::from_millis(100),
    );

    scheduler.start().await.unwrap();
    tokio::time::advance(Duration::from_millis(50)).await;
    tokio::task::yield_now().await;

    scheduler.stop().await.unwrap();
    // A second `start()` is refused: the main loop is paused, not gone.
    assert!(matches!(
        scheduler.start().await,
        Err(SchedulerError::AlreadyRunning)
    ));

    let before_resume = storage.completed.lock().unwrap().len();

    scheduler.resume().await.unwrap();
    for _ in 0..3 {
        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
    }

    let after_resume = storage.completed.lock().unwrap().len();
    assert!(
        after_resume > before_resume,
        "expected further firings after resume(), before={before_resume} after={after_resume}"
    );

    scheduler.stop().await.unwrap();
}
