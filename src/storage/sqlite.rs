//! SQLite-backed [`StorageAdapter`]. SQLite has no native `JSONB`/`INTERVAL`/`TIME` column
//! types, so `script` is stored as JSON text, `schedule_interval` as integer seconds, and
//! `schedule_time` as integer seconds-since-midnight.

use super::StorageAdapter;
use crate::errors::SchedulerError;
use crate::model::{Schedule, ScheduledProcess, ScheduleType, TaskRow};
use async_trait::async_trait;
use chrono::{DateTime, NaiveTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use std::time::Duration;
use uuid::Uuid;

/// Concrete [`StorageAdapter`] over a pooled [`SqlitePool`].
pub struct SqliteStorageAdapter {
    pool: SqlitePool,
}

impl SqliteStorageAdapter {
    /// Opens (and, if absent, creates) the database at `path`, then ensures the `schedules`,
    /// `scheduled_processes`, and `tasks` tables exist (§6.1).
    pub async fn connect(path: &str) -> Result<Self, SchedulerError> {
        let url = format!("sqlite://{path}?mode=rwc");
        let pool = SqlitePoolOptions::new()
            .max_connections(5)
            .connect(&url)
            .await?;

        Self::ensure_schema(&pool).await?;
        Ok(Self { pool })
    }

    async fn ensure_schema(pool: &SqlitePool) -> Result<(), SchedulerError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS scheduled_processes (
                name   TEXT PRIMARY KEY,
                script TEXT NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS schedules (
                id                TEXT PRIMARY KEY,
                schedule_name     TEXT NOT NULL,
                process_name      TEXT NOT NULL,
                schedule_type     INTEGER NOT NULL,
                schedule_time     INTEGER,
                schedule_day      INTEGER,
                schedule_interval INTEGER,
                exclusive         INTEGER NOT NULL
            )
            "#,
        )
        .execute(pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS tasks (
                id           TEXT PRIMARY KEY,
                process_name TEXT NOT NULL,
                state        INTEGER NOT NULL,
                start_time   TEXT NOT NULL,
                end_time     TEXT,
                pid          INTEGER NOT NULL,
                exit_code    INTEGER,
                reason       TEXT
            )
            "#,
        )
        .execute(pool)
        .await?;

        Ok(())
    }

    fn row_to_schedule(row: &SqliteRow) -> Result<Schedule, SchedulerError> {
        let id: String = row.try_get("id")?;
        let schedule_type: i64 = row.try_get("schedule_type")?;
        let schedule_time: Option<i64> = row.try_get("schedule_time")?;
        let schedule_day: Option<i64> = row.try_get("schedule_day")?;
        let schedule_interval: Option<i64> = row.try_get("schedule_interval")?;

        let kind = ScheduleType::from_code(schedule_type as i16).unwrap_or(ScheduleType::Manual);

        Ok(Schedule {
            id: Uuid::parse_str(&id).unwrap_or_else(|_| Uuid::nil()),
            name: row.try_get("schedule_name")?,
            process_name: row.try_get("process_name")?,
            kind,
            time: schedule_time.map(|secs| {
                NaiveTime::from_num_seconds_from_midnight_opt(secs as u32, 0)
                    .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap())
            }),
            day: schedule_day.map(|d| d as u8),
            repeat: schedule_interval.map(|secs| Duration::from_secs(secs as u64)),
            exclusive: row.try_get::<i64, _>("exclusive")? != 0,
        })
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorageAdapter {
    async fn query_scheduled_processes(&self) -> Result<Vec<ScheduledProcess>, SchedulerError> {
        let rows = sqlx::query("SELECT name, script FROM scheduled_processes")
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter()
            .map(|row| {
                let name: String = row.try_get("name")?;
                let script: String = row.try_get("script")?;
                let argv: Vec<String> = serde_json::from_str(&script).map_err(|e| {
                    SchedulerError::ConfigError(format!(
                        "scheduled_processes.script for '{name}' is not a JSON array of strings: {e}"
                    ))
                })?;
                Ok(ScheduledProcess { name, argv })
            })
            .collect()
    }

    async fn query_schedules(&self) -> Result<Vec<Schedule>, SchedulerError> {
        let rows = sqlx::query(
            "SELECT id, schedule_name, process_name, schedule_type, schedule_time, \
             schedule_day, schedule_interval, exclusive FROM schedules",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_schedule).collect()
    }

    async fn insert_task(&self, task: &TaskRow) -> Result<(), SchedulerError> {
        sqlx::query(
            "INSERT INTO tasks (id, process_name, state, start_time, end_time, pid, exit_code, reason) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(task.id.to_string())
        .bind(&task.process_name)
        .bind(task.state.code())
        .bind(task.start_time.to_rfc3339())
        .bind(task.end_time.map(|t| t.to_rfc3339()))
        .bind(task.pid as i64)
        .bind(task.exit_code)
        .bind(&task.reason)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn update_task_on_complete(
        &self,
        id: Uuid,
        exit_code: Option<i32>,
        end_time: DateTime<Utc>,
    ) -> Result<(), SchedulerError> {
        sqlx::query("UPDATE tasks SET state = ?, exit_code = ?, end_time = ? WHERE id = ?")
            .bind(crate::model::TaskState::Complete.code())
            .bind(exit_code)
            .bind(end_time.to_rfc3339())
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
