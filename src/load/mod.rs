//! Loader: atomically replaces a target window's contents with extracted
//! rows under delete-before-insert idempotence.

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use tiberius::Row as SourceRow;
use uuid::Uuid;

use crate::catalog::{ColumnDescriptor, NativeTypeCategory, SchemaCatalog};
use crate::libs::error::EtlError;
use crate::libs::retry::with_backoff;
use crate::store::{ProgressHandle, WindowSpec};

/// Bulk-insert and transaction-grouping parameters.
#[derive(Debug, Clone, Copy)]
pub struct LoadParams {
    pub chunk_size: usize,
    pub commit_interval: usize,
}

impl Default for LoadParams {
    fn default() -> Self {
        Self { chunk_size: 10_000, commit_interval: 100_000 }
    }
}

/// Result of a completed load, used by the Replication Driver to finalize
/// the progress row.
#[derive(Debug, Default)]
pub struct LoadOutcome {
    pub rows_loaded: u64,
}

/// Commit-boundary progress reporting, threaded down from the Replication
/// Driver. Every transaction commit advances `handle`'s row so a crash
/// leaves a checkpoint behind instead of a stale RUNNING row with no
/// indication of how far the load got.
pub struct CommitProgress<'a> {
    pub handle: &'a ProgressHandle,
    /// Already known in full before the load starts, since batches are
    /// materialized up front; reported at every commit so `rows_extracted`
    /// reflects the unit's total rather than a partial count.
    pub rows_extracted_total: u64,
    /// The column `checkpoint_data` tracks, matching the Extractor's
    /// `ORDER BY` column for this table's resumability.
    pub order_column: Option<&'a ColumnDescriptor>,
    /// True when this attempt is continuing from a prior checkpoint rather
    /// than starting fresh, so the caller can skip the window delete.
    pub resuming: bool,
}

/// Deletes the target window's current contents. Runs with indexes live so
/// the delete itself can use them.
pub async fn delete_window(pool: &PgPool, target_table: &str, date_column: Option<&str>, window: &WindowSpec) -> Result<(), EtlError> {
    let sql = match (date_column, window) {
        (Some(column), WindowSpec::DateRange { start, end }) => {
            format!("DELETE FROM \"{}\" WHERE \"{}\" >= '{}' AND \"{}\" < '{}'", target_table, column, start, column, end)
        }
        _ => format!("TRUNCATE \"{}\"", target_table),
    };
    with_backoff("loader-delete-window", || {
        Box::pin(async { sqlx::query(&sql).execute(pool).await.map_err(|e| EtlError::TargetUnavailable(e.into())) })
    })
    .await?;
    Ok(())
}

/// Drops every non-primary-key index on `target_table`. Postgres has no
/// index-disable primitive, so the engine drops and recreates instead (an
/// Open Question resolution recorded in DESIGN.md).
pub async fn drop_secondary_indexes(pool: &PgPool, target_table: &str) -> Result<Vec<String>, EtlError> {
    let rows: Vec<(String, String)> = sqlx::query_as(
        "SELECT indexname, indexdef FROM pg_indexes WHERE tablename = $1 AND indexname NOT LIKE '%_pkey'",
    )
    .bind(target_table)
    .fetch_all(pool)
    .await
    .map_err(|e| EtlError::TargetUnavailable(e.into()))?;

    for (name, _) in &rows {
        sqlx::query(&format!("DROP INDEX IF EXISTS \"{}\"", name))
            .execute(pool)
            .await
            .map_err(|e| EtlError::TargetUnavailable(e.into()))?;
    }
    Ok(rows.into_iter().map(|(_, def)| def).collect())
}

/// Recreates indexes previously captured by [`drop_secondary_indexes`].
/// Called both on success and during failure cleanup, so the table stays
/// queryable either way.
pub async fn rebuild_indexes(pool: &PgPool, index_definitions: &[String]) -> Result<(), EtlError> {
    for definition in index_definitions {
        sqlx::query(definition).execute(pool).await.map_err(|e| EtlError::TargetUnavailable(e.into()))?;
    }
    Ok(())
}

/// Bulk-inserts `batches` under a table-level lock, grouping commits by
/// `commit_interval` rows. Postgres has no literal "table lock hint"; the
/// lock is instead taken explicitly inside the same transaction (an Open
/// Question resolution recorded in DESIGN.md).
///
/// When `progress` is set, `ProgressHandle::update` is called after every
/// commit with the cumulative row counts and a checkpoint built from the
/// last row of the most recently committed batch, so an interrupted load
/// can resume from there instead of from the window's start.
pub async fn insert_batches(
    pool: &PgPool,
    target_table: &str,
    columns: &[ColumnDescriptor],
    mut batches: impl Iterator<Item = Vec<SourceRow>>,
    params: LoadParams,
    progress: Option<CommitProgress<'_>>,
) -> Result<LoadOutcome, EtlError> {
    let mut outcome = LoadOutcome::default();
    let mut txn: Option<Transaction<'_, Postgres>> = None;
    let mut rows_since_commit: usize = 0;
    let mut chunks_committed: i64 = 0;
    let mut last_checkpoint: Option<Value> = None;

    while let Some(batch) = batches.next() {
        if txn.is_none() {
            let mut new_txn = pool.begin().await.map_err(|e| EtlError::TargetUnavailable(e.into()))?;
            sqlx::query(&format!("LOCK TABLE \"{}\" IN EXCLUSIVE MODE", target_table))
                .execute(&mut *new_txn)
                .await
                .map_err(|e| EtlError::TargetUnavailable(e.into()))?;
            txn = Some(new_txn);
        }

        if let Some(commit_progress) = &progress {
            if let Some(order_column) = commit_progress.order_column {
                if let Some(value) = batch.last().and_then(|row| checkpoint_value(row, order_column)) {
                    last_checkpoint = Some(value);
                }
            }
        }

        let rows_in_batch = batch.len();
        insert_one_batch(txn.as_mut().unwrap(), target_table, columns, batch).await?;
        outcome.rows_loaded += rows_in_batch as u64;
        rows_since_commit += rows_in_batch;
        chunks_committed += 1;

        if rows_since_commit >= params.commit_interval {
            txn.take().unwrap().commit().await.map_err(|e| EtlError::TargetUnavailable(e.into()))?;
            rows_since_commit = 0;
            report_commit(&progress, &outcome, chunks_committed, &last_checkpoint).await?;
        }
    }

    if let Some(txn) = txn {
        txn.commit().await.map_err(|e| EtlError::TargetUnavailable(e.into()))?;
        report_commit(&progress, &outcome, chunks_committed, &last_checkpoint).await?;
    }

    Ok(outcome)
}

async fn report_commit(progress: &Option<CommitProgress<'_>>, outcome: &LoadOutcome, chunks_committed: i64, checkpoint: &Option<Value>) -> Result<(), EtlError> {
    if let Some(commit_progress) = progress {
        commit_progress
            .handle
            .update(commit_progress.rows_extracted_total as i64, outcome.rows_loaded as i64, Some(chunks_committed), checkpoint.clone())
            .await?;
    }
    Ok(())
}

/// The checkpoint value for `column` from `row`, read through the Rust type
/// matching its catalog native type and stringified, matching how the
/// Extractor compares against it in a new `WHERE` clause.
fn checkpoint_value(row: &SourceRow, column: &ColumnDescriptor) -> Option<Value> {
    let name = column.name.as_str();
    let as_string = match column.category() {
        NativeTypeCategory::Integer => row.get::<i32, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::BigInt => row.get::<i64, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::SmallInt => row.get::<i16, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::TinyInt => row.get::<u8, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::Boolean => row.get::<bool, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::Float => row.get::<f64, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::Decimal => row.get::<Decimal, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::Date => row.get::<NaiveDate, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::DateTime => row.get::<NaiveDateTime, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::Uuid => row.get::<Uuid, _>(name).map(|v| v.to_string()),
        NativeTypeCategory::Text => row.get::<&str, _>(name).map(str::to_owned),
    };
    as_string.map(Value::String)
}

async fn insert_one_batch(
    txn: &mut Transaction<'_, Postgres>,
    target_table: &str,
    columns: &[ColumnDescriptor],
    batch: Vec<SourceRow>,
) -> Result<(), EtlError> {
    if batch.is_empty() {
        return Ok(());
    }
    let column_names = columns.iter().map(|c| format!("\"{}\"", c.name)).collect::<Vec<_>>().join(", ");
    let mut query = format!("INSERT INTO \"{}\" ({}) VALUES ", target_table, column_names);
    let mut placeholders = Vec::with_capacity(batch.len());
    let mut index = 1;
    for _ in &batch {
        let marks: Vec<String> = (0..columns.len()).map(|_| { let s = format!("${}", index); index += 1; s }).collect();
        placeholders.push(format!("({})", marks.join(", ")));
    }
    query.push_str(&placeholders.join(", "));

    let mut builder = sqlx::query(&query);
    for row in &batch {
        for column in columns {
            builder = bind_source_value(builder, row, column);
        }
    }

    builder.execute(&mut **txn).await.map_err(|e| classify_insert_error(e, target_table))?;
    Ok(())
}

/// Reads `row`'s value for `column` through the Rust type matching its
/// catalog native type, then binds that typed value. Binding every column
/// as a string regardless of native type works by accident for text columns
/// and panics or fails the INSERT for everything else (an integer column
/// bound from a string has no implicit cast in Postgres).
fn bind_source_value<'q>(
    builder: sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments>,
    row: &'q SourceRow,
    column: &ColumnDescriptor,
) -> sqlx::query::Query<'q, Postgres, sqlx::postgres::PgArguments> {
    let name = column.name.as_str();
    match column.category() {
        NativeTypeCategory::Integer => builder.bind(row.get::<i32, _>(name)),
        NativeTypeCategory::BigInt => builder.bind(row.get::<i64, _>(name)),
        NativeTypeCategory::SmallInt => builder.bind(row.get::<i16, _>(name)),
        NativeTypeCategory::TinyInt => builder.bind(row.get::<u8, _>(name).map(i16::from)),
        NativeTypeCategory::Boolean => builder.bind(row.get::<bool, _>(name)),
        NativeTypeCategory::Float => builder.bind(row.get::<f64, _>(name)),
        NativeTypeCategory::Decimal => builder.bind(row.get::<Decimal, _>(name)),
        NativeTypeCategory::Date => builder.bind(row.get::<NaiveDate, _>(name)),
        NativeTypeCategory::DateTime => builder.bind(row.get::<NaiveDateTime, _>(name)),
        NativeTypeCategory::Uuid => builder.bind(row.get::<Uuid, _>(name)),
        NativeTypeCategory::Text => builder.bind(row.get::<&str, _>(name).map(str::to_owned)),
    }
}

fn classify_insert_error(error: sqlx::Error, table: &str) -> EtlError {
    if let sqlx::Error::Database(db_err) = &error {
        if db_err.is_unique_violation() {
            return EtlError::SourceIntegrity {
                table: table.to_string(),
                detail: db_err.message().to_string(),
            };
        }
    }
    EtlError::LoadFailed(error.into())
}

/// Full load of one work unit: delete, drop indexes, insert, rebuild
/// indexes. On failure, still attempts the index rebuild before
/// propagating the original error.
///
/// When `progress` carries `resuming: true`, the window delete is skipped:
/// a resumed attempt is continuing an earlier attempt's partial insert, and
/// deleting the window first would discard the rows that attempt already
/// committed.
pub async fn load_window(
    pool: &PgPool,
    catalog: &SchemaCatalog,
    source_table: &str,
    window: &WindowSpec,
    batches: impl Iterator<Item = Vec<SourceRow>>,
    params: LoadParams,
    progress: Option<CommitProgress<'_>>,
) -> Result<LoadOutcome, EtlError> {
    let target_table = catalog.target_table_name(source_table);
    let columns = catalog.columns(source_table)?;
    let date_column = catalog.date_filter_column(source_table);

    let resuming = progress.as_ref().is_some_and(|p| p.resuming);
    if !resuming {
        delete_window(pool, &target_table, date_column, window).await?;
    }
    let index_definitions = drop_secondary_indexes(pool, &target_table).await?;

    let result = insert_batches(pool, &target_table, columns, batches, params, progress).await;

    // Rebuild runs regardless of success so the table remains queryable.
    let rebuild_result = rebuild_indexes(pool, &index_definitions).await;

    let outcome = result?;
    rebuild_result?;
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_load_params_use_ten_thousand_row_chunks_and_hundred_thousand_row_commits() {
        let params = LoadParams::default();
        assert_eq!(params.chunk_size, 10_000);
        assert_eq!(params.commit_interval, 100_000);
    }
}
