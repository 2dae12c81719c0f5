//! The per-(table, window) progress log (`etl_replica_progress`).

use chrono::NaiveDate;
use serde_json::Value;
use sqlx::PgPool;

use crate::libs::error::EtlError;

/// A work unit's window: either a half-open date range or the "full-table"
/// sentinel for tables with no date-filter column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowSpec {
    FullTable,
    DateRange { start: NaiveDate, end: NaiveDate },
}

impl WindowSpec {
    /// The `(window_start, window_end)` text pair stored in the progress
    /// row; `full-table` on both sides for the sentinel case.
    pub fn as_db_strings(&self) -> (String, String) {
        match self {
            WindowSpec::FullTable => ("full-table".to_string(), "full-table".to_string()),
            WindowSpec::DateRange { start, end } => (start.to_string(), end.to_string()),
        }
    }

    /// Human-readable tag used in log lines and CLI summaries.
    pub fn tag(&self) -> String {
        match self {
            WindowSpec::FullTable => "full-table".to_string(),
            WindowSpec::DateRange { start, end } => format!("{}..{}", start, end),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgressStatus {
    Running,
    Completed,
    Failed,
    Interrupted,
}

impl ProgressStatus {
    fn as_str(self) -> &'static str {
        match self {
            ProgressStatus::Running => "RUNNING",
            ProgressStatus::Completed => "COMPLETED",
            ProgressStatus::Failed => "FAILED",
            ProgressStatus::Interrupted => "INTERRUPTED",
        }
    }

    fn from_str(value: &str) -> Option<Self> {
        match value {
            "RUNNING" => Some(ProgressStatus::Running),
            "COMPLETED" => Some(ProgressStatus::Completed),
            "FAILED" => Some(ProgressStatus::Failed),
            "INTERRUPTED" => Some(ProgressStatus::Interrupted),
            _ => None,
        }
    }
}

/// A claimed progress row. Holds only the row's identity, never a live
/// handle into a cache; every method issues its own
/// short transaction rather than holding one open across extract/load work.
pub struct ProgressHandle {
    pool: PgPool,
    pub id: i64,
    pub table: String,
    pub job_date: NaiveDate,
    pub window: WindowSpec,
}

impl ProgressHandle {
    pub async fn update(&self, rows_extracted: i64, rows_loaded: i64, last_chunk_id: Option<i64>, checkpoint: Option<Value>) -> Result<(), EtlError> {
        sqlx::query(
            "UPDATE etl_replica_progress SET rows_extracted = $1, rows_loaded = $2, last_chunk_id = $3, checkpoint_data = $4 WHERE id = $5",
        )
        .bind(rows_extracted)
        .bind(rows_loaded)
        .bind(last_chunk_id)
        .bind(checkpoint)
        .bind(self.id)
        .execute(&self.pool)
        .await
        .map_err(|e| EtlError::TargetUnavailable(e.into()))?;
        Ok(())
    }

    pub async fn complete(&self, rows_extracted: i64, rows_loaded: i64) -> Result<(), EtlError> {
        self.terminate(ProgressStatus::Completed, rows_extracted, rows_loaded, None).await
    }

    pub async fn fail(&self, message: &str) -> Result<(), EtlError> {
        self.terminate(ProgressStatus::Failed, 0, 0, Some(message)).await
    }

    pub async fn interrupt(&self) -> Result<(), EtlError> {
        self.terminate(ProgressStatus::Interrupted, 0, 0, None).await
    }

    async fn terminate(&self, status: ProgressStatus, rows_extracted: i64, rows_loaded: i64, message: Option<&str>) -> Result<(), EtlError> {
        let query = if matches!(status, ProgressStatus::Completed) {
            "UPDATE etl_replica_progress SET status = $1, rows_extracted = $2, rows_loaded = $3, batch_end = now(), message = $4 WHERE id = $5"
        } else {
            "UPDATE etl_replica_progress SET status = $1, batch_end = now(), message = $4 WHERE id = $5"
        };
        sqlx::query(query)
            .bind(status.as_str())
            .bind(rows_extracted)
            .bind(rows_loaded)
            .bind(message)
            .bind(self.id)
            .execute(&self.pool)
            .await
            .map_err(|e| EtlError::TargetUnavailable(e.into()))?;
        Ok(())
    }
}

#[derive(Clone)]
pub struct ProgressStore {
    pool: PgPool,
}

impl ProgressStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a RUNNING row for `(table, window)`. Fails with
    /// `WorkUnitBusy` if the partial unique index rejects the insert
    /// because another RUNNING row already owns this exact work unit.
    pub async fn claim(&self, table: &str, job_date: NaiveDate, window: WindowSpec) -> Result<ProgressHandle, EtlError> {
        let (window_start, window_end) = window.as_db_strings();
        let row: Result<(i64,), sqlx::Error> = sqlx::query_as(
            "INSERT INTO etl_replica_progress (table_name, job_date, window_start, window_end, status) \
             VALUES ($1, $2, $3, $4, 'RUNNING') RETURNING id",
        )
        .bind(table)
        .bind(job_date)
        .bind(&window_start)
        .bind(&window_end)
        .fetch_one(&self.pool)
        .await;

        match row {
            Ok((id,)) => Ok(ProgressHandle {
                pool: self.pool.clone(),
                id,
                table: table.to_string(),
                job_date,
                window,
            }),
            Err(sqlx::Error::Database(db_err)) if db_err.is_unique_violation() => Err(EtlError::WorkUnitBusy {
                table: table.to_string(),
                window: window.tag(),
            }),
            Err(e) => Err(EtlError::TargetUnavailable(e.into())),
        }
    }

    /// The most recent terminal status for `(table, window)`, used for
    /// `--skip-existing` checks before claiming.
    pub async fn latest_status(&self, table: &str, window: &WindowSpec) -> Result<Option<ProgressStatus>, EtlError> {
        let (window_start, window_end) = window.as_db_strings();
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT status FROM etl_replica_progress WHERE table_name = $1 AND window_start = $2 AND window_end = $3 \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(table)
        .bind(&window_start)
        .bind(&window_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EtlError::TargetUnavailable(e.into()))?;
        Ok(row.and_then(|(s,)| ProgressStatus::from_str(&s)))
    }

    /// The checkpoint left by the most recent FAILED or INTERRUPTED attempt
    /// at `(table, window)`. A COMPLETED or absent prior attempt yields
    /// `None`: only a genuinely incomplete attempt should resume instead of
    /// reprocessing the window from the start.
    pub async fn resumable_checkpoint(&self, table: &str, window: &WindowSpec) -> Result<Option<Value>, EtlError> {
        let (window_start, window_end) = window.as_db_strings();
        let row: Option<(String, Option<Value>)> = sqlx::query_as(
            "SELECT status, checkpoint_data FROM etl_replica_progress \
             WHERE table_name = $1 AND window_start = $2 AND window_end = $3 \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(table)
        .bind(&window_start)
        .bind(&window_end)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| EtlError::TargetUnavailable(e.into()))?;

        Ok(row.and_then(|(status, checkpoint)| match ProgressStatus::from_str(&status) {
            Some(ProgressStatus::Failed) | Some(ProgressStatus::Interrupted) => checkpoint,
            _ => None,
        }))
    }

    /// Flips RUNNING rows with no live owner to INTERRUPTED on orchestrator
    /// startup, after a process crash leaves them orphaned.
    pub async fn orphan_scan(&self) -> Result<usize, EtlError> {
        let result = sqlx::query("UPDATE etl_replica_progress SET status = 'INTERRUPTED', batch_end = now() WHERE status = 'RUNNING'")
            .execute(&self.pool)
            .await
            .map_err(|e| EtlError::TargetUnavailable(e.into()))?;
        Ok(result.rows_affected() as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn full_table_window_uses_sentinel_strings() {
        let window = WindowSpec::FullTable;
        assert_eq!(window.as_db_strings(), ("full-table".to_string(), "full-table".to_string()));
        assert_eq!(window.tag(), "full-table");
    }

    #[test]
    fn date_range_window_formats_as_iso_bounds() {
        let window = WindowSpec::DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        };
        assert_eq!(window.as_db_strings(), ("2024-01-15".to_string(), "2024-01-16".to_string()));
        assert_eq!(window.tag(), "2024-01-15..2024-01-16");
    }

    #[test]
    fn progress_status_round_trips_through_its_db_representation() {
        for status in [ProgressStatus::Running, ProgressStatus::Completed, ProgressStatus::Failed, ProgressStatus::Interrupted] {
            assert_eq!(ProgressStatus::from_str(status.as_str()), Some(status));
        }
    }
}
