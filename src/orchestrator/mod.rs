//! The T-0/T-1 daily scheduler: runs today's window, then re-pulls
//! yesterday's window so late source corrections replace it cleanly, and
//! records one run-history row regardless of per-table outcome.

use chrono::{Duration, NaiveDate, Utc};
use sqlx::PgPool;
use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::Compat;
use uuid::Uuid;

use crate::catalog::SchemaCatalog;
use crate::libs::error::EtlError;
use crate::libs::messages::Message;
use crate::load::LoadParams;
use crate::replicate::{self, UnitOptions};
use crate::store::history::{RunHistoryRecord, RunHistoryStore, RunType};
use crate::store::{ProgressStore, WindowSpec};
use crate::{msg_error, msg_info};

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub skip_t1: bool,
    pub tables: Vec<String>,
    pub params: LoadParams,
}

pub struct OrchestratorReport {
    pub run_id: Uuid,
    pub succeeded: Vec<String>,
    pub failed: Vec<(String, String)>,
}

impl OrchestratorReport {
    pub fn all_succeeded(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs the T-0 pass for `job_date`, then (unless skipped) the T-1 pass for
/// `job_date - 1 day`, over every configured table. A single bad table
/// never blocks the others - every table in the list is attempted, and the
/// aggregate is reported in one run-history row.
pub async fn run(
    source: &mut Client<Compat<TcpStream>>,
    target: &PgPool,
    progress: &ProgressStore,
    history: &RunHistoryStore,
    catalog: &std::sync::Arc<SchemaCatalog>,
    job_date: NaiveDate,
    options: OrchestratorOptions,
) -> Result<OrchestratorReport, EtlError> {
    let run_id = Uuid::new_v4();
    let start_ts = Utc::now();
    let orphaned = progress.orphan_scan().await?;
    if orphaned > 0 {
        msg_info!(Message::OrphanedUnitsReclaimed(orphaned));
    }

    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    msg_info!(Message::OrchestratorPassStarted("T-0".to_string()));
    let mut t0_succeeded = Vec::new();
    let mut t0_failed = Vec::new();
    run_pass(source, target, progress, catalog, &options.tables, job_date, job_date, job_date + Duration::days(1), options.params, &mut t0_succeeded, &mut t0_failed).await;
    msg_info!(Message::OrchestratorPassCompleted { pass: "T-0".to_string(), succeeded: t0_succeeded.len(), failed: t0_failed.len() });
    succeeded.extend(t0_succeeded);
    failed.extend(t0_failed);

    if !options.skip_t1 {
        msg_info!(Message::OrchestratorPassStarted("T-1".to_string()));
        let mut t1_succeeded = Vec::new();
        let mut t1_failed = Vec::new();
        run_pass(
            source,
            target,
            progress,
            catalog,
            &options.tables,
            job_date,
            job_date - Duration::days(1),
            job_date,
            options.params,
            &mut t1_succeeded,
            &mut t1_failed,
        )
        .await;
        msg_info!(Message::OrchestratorPassCompleted { pass: "T-1".to_string(), succeeded: t1_succeeded.len(), failed: t1_failed.len() });
        succeeded.extend(t1_succeeded);
        failed.extend(t1_failed);
    }

    let end_ts = Utc::now();
    let success = failed.is_empty();
    history
        .record(RunHistoryRecord {
            run_id,
            run_type: RunType::T0,
            start_ts,
            end_ts,
            start_date: job_date - Duration::days(1),
            end_date: job_date + Duration::days(1),
            processed_tables: options.tables.clone(),
            success,
            error_message: if success { None } else { Some(format!("{} table(s) failed", failed.len())) },
        })
        .await?;
    msg_info!(Message::OrchestratorRunRecorded(run_id.to_string()));

    Ok(OrchestratorReport { run_id, succeeded, failed })
}

#[allow(clippy::too_many_arguments)]
async fn run_pass(
    source: &mut Client<Compat<TcpStream>>,
    target: &PgPool,
    progress: &ProgressStore,
    catalog: &std::sync::Arc<SchemaCatalog>,
    tables: &[String],
    job_date: NaiveDate,
    window_start: NaiveDate,
    window_end: NaiveDate,
    params: LoadParams,
    succeeded: &mut Vec<String>,
    failed: &mut Vec<(String, String)>,
) {
    for table in tables {
        let window = WindowSpec::DateRange { start: window_start, end: window_end };
        let result = replicate::replicate_unit(source, target, progress, catalog, table, job_date, window, params, UnitOptions::default()).await;
        match result {
            Ok(_) => succeeded.push(table.clone()),
            Err(err) => {
                msg_error!(Message::WorkUnitFailed { table: table.clone(), window: format!("{}..{}", window_start, window_end), error: err.to_string() });
                failed.push((table.clone(), err.to_string()));
            }
        }
    }
}
