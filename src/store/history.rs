//! The per-run summary table (`replica_run_history`).

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::libs::error::EtlError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunType {
    T0,
    T1,
    Backfill,
    Manual,
}

impl RunType {
    fn as_str(self) -> &'static str {
        match self {
            RunType::T0 => "T0",
            RunType::T1 => "T1",
            RunType::Backfill => "backfill",
            RunType::Manual => "manual",
        }
    }
}

/// One row per orchestrator invocation, written once at the end of a run.
pub struct RunHistoryRecord {
    pub run_id: Uuid,
    pub run_type: RunType,
    pub start_ts: DateTime<Utc>,
    pub end_ts: DateTime<Utc>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub processed_tables: Vec<String>,
    pub success: bool,
    pub error_message: Option<String>,
}

pub struct RunHistoryStore {
    pool: PgPool,
}

impl RunHistoryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn record(&self, record: RunHistoryRecord) -> Result<(), EtlError> {
        sqlx::query(
            "INSERT INTO replica_run_history \
             (run_id, run_type, start_ts, end_ts, start_date, end_date, processed_tables, success, error_message) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(record.run_id)
        .bind(record.run_type.as_str())
        .bind(record.start_ts)
        .bind(record.end_ts)
        .bind(record.start_date)
        .bind(record.end_date)
        .bind(&record.processed_tables)
        .bind(record.success)
        .bind(&record.error_message)
        .execute(&self.pool)
        .await
        .map_err(|e| EtlError::TargetUnavailable(e.into()))?;
        Ok(())
    }
}
