//! Replication Driver: glues Extractor and Loader for one work unit with
//! full progress accounting.
//!
//! ```text
//!   INIT → CLAIMED → DELETING → LOADING → INDEXING → COMPLETED
//!                                  │
//!                                  └→ FAILED        (terminal)
//!                                  └→ INTERRUPTED    (terminal, resumable)
//! ```

use std::sync::Arc;
use std::time::Instant;

use chrono::NaiveDate;
use sqlx::PgPool;
use tiberius::Client;
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

use crate::catalog::{Resumability, SchemaCatalog};
use crate::extract::{self, ExtractCheckpoint};
use crate::libs::error::EtlError;
use crate::libs::messages::Message;
use crate::load::{self, CommitProgress, LoadParams};
use crate::store::{ProgressHandle, ProgressStatus, ProgressStore, WindowSpec};
use crate::{msg_error, msg_info, msg_success};

/// Caller-supplied policy for a work unit that already has a terminal
/// progress row.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnitOptions {
    pub skip_existing: bool,
}

/// Outcome of one (table, window) replication attempt.
pub struct UnitResult {
    pub table: String,
    pub window: WindowSpec,
    pub rows_loaded: u64,
    pub succeeded: bool,
}

/// Runs the Extractor → Loader cycle for one work unit, recording every
/// transition in the Progress Store.
pub async fn replicate_unit(
    source: &mut Client<Compat<TcpStream>>,
    target: &PgPool,
    progress: &ProgressStore,
    catalog: &Arc<SchemaCatalog>,
    table: &str,
    job_date: NaiveDate,
    window: WindowSpec,
    params: LoadParams,
    options: UnitOptions,
) -> Result<UnitResult, EtlError> {
    if options.skip_existing {
        if let Some(ProgressStatus::Completed) = progress.latest_status(table, &window).await? {
            msg_info!(Message::ReplicationUnitSkippedExisting { table: table.to_string(), window: window.tag() });
            return Ok(UnitResult { table: table.to_string(), window, rows_loaded: 0, succeeded: true });
        }
    }

    let started = Instant::now();
    msg_info!(Message::ReplicationUnitStarted { table: table.to_string(), window: window.tag() });

    // A checkpoint only exists for a prior FAILED or INTERRUPTED attempt at
    // this exact work unit; read it before claiming so the new RUNNING row
    // `claim` inserts (with a NULL checkpoint_data of its own) doesn't mask it.
    let resume_checkpoint = progress
        .resumable_checkpoint(table, &window)
        .await?
        .map(serde_json::from_value::<ExtractCheckpoint>)
        .transpose()
        .map_err(|e| EtlError::Configuration(format!("malformed checkpoint for {} {}: {}", table, window.tag(), e)))?;
    if resume_checkpoint.is_some() {
        msg_info!(Message::WorkUnitResuming { table: table.to_string(), window: window.tag() });
    }

    // INIT -> CLAIMED
    let handle = match progress.claim(table, job_date, window.clone()).await {
        Ok(handle) => handle,
        Err(EtlError::WorkUnitBusy { table, window }) => {
            msg_error!(Message::WorkUnitBusy { table: table.clone(), window: window.clone() });
            return Err(EtlError::WorkUnitBusy { table, window });
        }
        Err(e) => return Err(e),
    };

    let resumability = catalog.resumability(table)?;
    let run_result = run_unit(source, target, catalog, table, &window, resumability, params, &handle, resume_checkpoint).await;

    match run_result {
        Ok(outcome) => {
            handle.complete(outcome.rows_extracted as i64, outcome.rows_loaded as i64).await?;
            msg_success!(Message::ReplicationUnitSucceeded {
                table: table.to_string(),
                window: window.tag(),
                rows: outcome.rows_loaded,
                elapsed_ms: started.elapsed().as_millis(),
            });
            Ok(UnitResult { table: table.to_string(), window, rows_loaded: outcome.rows_loaded, succeeded: true })
        }
        Err(EtlError::Cancelled) => {
            handle.interrupt().await?;
            msg_info!(Message::WorkUnitInterrupted { table: table.to_string(), window: window.tag() });
            Err(EtlError::Cancelled)
        }
        Err(err) => {
            handle.fail(&err.to_string()).await?;
            msg_error!(Message::ReplicationUnitFailed { table: table.to_string(), window: window.tag(), error: err.to_string() });
            Err(err)
        }
    }
}

struct UnitOutcome {
    rows_extracted: u64,
    rows_loaded: u64,
}

async fn run_unit(
    source: &mut Client<Compat<TcpStream>>,
    target: &PgPool,
    catalog: &SchemaCatalog,
    table: &str,
    window: &WindowSpec,
    resumability: Resumability,
    params: LoadParams,
    handle: &ProgressHandle,
    resume_checkpoint: Option<ExtractCheckpoint>,
) -> Result<UnitOutcome, EtlError> {
    let query = extract::build_query(catalog, table, window, resumability, resume_checkpoint.as_ref())?;
    let cursor = extract::open_cursor(source, &query).await?;
    let mut rows_extracted = 0u64;

    // The Loader takes a synchronous `Iterator<Item = Vec<Row>>`, so batches
    // are materialized here before the transaction-grouping loop.
    let batches = extract::batches(cursor, params.chunk_size);
    futures::pin_mut!(batches);
    let mut materialized = Vec::new();
    while let Some(batch) = futures::StreamExt::next(&mut batches).await {
        let batch = batch?;
        rows_extracted += batch.len() as u64;
        materialized.push(batch);
    }

    let order_column = extract::order_column_for(catalog, table, resumability)?;
    let commit_progress = CommitProgress {
        handle,
        rows_extracted_total: rows_extracted,
        order_column,
        resuming: resume_checkpoint.is_some(),
    };
    let outcome = load::load_window(target, catalog, table, window, materialized.into_iter(), params, Some(commit_progress)).await?;
    Ok(UnitOutcome { rows_extracted, rows_loaded: outcome.rows_loaded })
}
