//! (S6) STARTUP fires once on the first tick and never persists a task row. (Testable property
//! 1/2) An INTERVAL schedule fires repeatedly and each firing is persisted RUNNING then COMPLETE.

mod support;

use cadence_scheduler::clock::SystemClock;
use cadence_scheduler::model::{Schedule, ScheduledProcess, ScheduleType};
use cadence_scheduler::scheduler::Scheduler;
use std::sync::Arc;
use std::time::Duration;
use support::{InstantLauncher, MemoryStorage};
use uuid::Uuid;

#[tokio::test(start_paused = true)]
async fn startup_schedule_fires_once_and_persists_nothing() {
    let schedule = Schedule {
        id: Uuid::new_v4(),
        name: "bootstrap".into(),
        process_name: "noop".into(),
        kind: ScheduleType::Startup,
        time: None,
        day: None,
        repeat: None,
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
    tokio::time::advance(Duration::from_millis(10)).await;
    tokio::task::yield_now().await;

    scheduler.stop().await.unwrap();

    // STARTUP tasks never get a `tasks` row (§3.2, S6).
    assert!(storage.inserted.lock().unwrap().is_empty());
    assert!(storage.completed.lock().unwrap().is_empty());
}

#[tokio::test(start_paused = true)]
async fn interval_schedule_fires_repeatedly_and_persists_each_task() {
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

    for _ in 0..5 {
        tokio::time::advance(Duration::from_millis(50)).await;
        tokio::task::yield_now().await;
    }

    scheduler.stop().await.unwrap();

    let inserted = storage.inserted.lock().unwrap().len();
    let completed = storage.completed.lock().unwrap().len();

    assert!(inserted >= 3, "expected several RUNNING rows, got {inserted}");
    assert_eq!(inserted, completed, "every RUNNING row should be finalized");
}
