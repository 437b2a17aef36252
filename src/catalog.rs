//! Schedule Catalog (§4.2): an immutable, in-memory snapshot of `schedules` and
//! `scheduled_processes`, loaded once at `start()` and read for the lifetime of the run.

use crate::errors::SchedulerError;
use crate::model::{Schedule, ScheduledProcess};
use crate::storage::StorageAdapter;
use dashmap::DashMap;
use uuid::Uuid;

/// Read-only snapshot of the catalog tables. Rows referencing an unknown `process_name` are
/// still loaded — launch attempts against them fail and are logged rather than rejected at
/// load time (§4.2). Backed by [`DashMap`] rather than a plain `HashMap`: the catalog is shared
/// via `Arc` and read concurrently by the main loop and every in-flight launch (§5).
#[derive(Debug)]
pub struct ScheduleCatalog {
    schedules: DashMap<Uuid, Schedule>,
    processes: DashMap<String, ScheduledProcess>,
}

impl ScheduleCatalog {
    /// Scans `scheduled_processes` then `schedules` through `storage`. Insertion order of
    /// either table is irrelevant to the resulting catalog.
    pub async fn load(storage: &dyn StorageAdapter) -> Result<Self, SchedulerError> {
        let processes = storage
            .query_scheduled_processes()
            .await?
            .into_iter()
            .map(|p| (p.name.clone(), p))
            .collect();

        let schedules = storage
            .query_schedules()
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();

        Ok(Self { schedules, processes })
    }

    /// A snapshot of every catalog schedule, in no particular order.
    pub fn schedules(&self) -> Vec<Schedule> {
        self.schedules.iter().map(|entry| entry.value().clone()).collect()
    }

    /// Looks up a schedule by id; `None` if it has since been removed from the catalog
    /// snapshot (it never is, within a single run, but callers treat this as fallible per
    /// §7 `MissingCatalogEntry`).
    pub fn schedule(&self, id: &Uuid) -> Option<Schedule> {
        self.schedules.get(id).map(|entry| entry.value().clone())
    }

    /// Resolves a process name to its argv.
    pub fn argv(&self, process_name: &str) -> Option<Vec<String>> {
        self.processes.get(process_name).map(|entry| entry.value().argv.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ScheduleType;
    use async_trait::async_trait;
    use crate::model::TaskRow;

    #[derive(Default)]
    struct FakeStorage {
        processes: Vec<ScheduledProcess>,
        schedules: Vec<Schedule>,
    }

    #[async_trait]
    impl StorageAdapter for FakeStorage {
        async fn query_scheduled_processes(&self) -> Result<Vec<ScheduledProcess>, SchedulerError> {
            Ok(self.processes.clone())
        }

        async fn query_schedules(&self) -> Result<Vec<Schedule>, SchedulerError> {
            Ok(self.schedules.clone())
        }

        async fn insert_task(&self, _row: &TaskRow) -> Result<(), SchedulerError> {
            Ok(())
        }

        async fn update_task_on_complete(
            &self,
            _id: Uuid,
            _exit_code: Option<i32>,
            _end_time: chrono::DateTime<chrono::Utc>,
        ) -> Result<(), SchedulerError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn loads_schedules_referencing_unknown_processes_without_failing() {
        let storage = FakeStorage {
            processes: vec![],
            schedules: vec![Schedule {
                id: Uuid::nil(),
                name: "orphan".into(),
                process_name: "does-not-exist".into(),
                kind: ScheduleType::Manual,
                time: None,
                day: None,
                repeat: None,
                exclusive: false,
            }],
        };

        let catalog = ScheduleCatalog::load(&storage).await.unwrap();
        assert!(catalog.schedule(&Uuid::nil()).is_some());
        assert!(catalog.argv("does-not-exist").is_none());
    }
}
