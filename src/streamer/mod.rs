//! Shards a wide date range into month-aligned windows and dispatches them
//! to a bounded worker pool, each worker running a full Replication Driver
//! cycle. All workers write to the same target table, so concurrency above
//! a small ceiling risks lock escalation against the table-level insert
//! lock; the default worker count reflects that.

use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use sqlx::PgPool;
use tiberius::Client;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::task::JoinSet;
use tokio_util::compat::Compat;

use crate::catalog::SchemaCatalog;
use crate::libs::error::EtlError;
use crate::libs::messages::Message;
use crate::load::LoadParams;
use crate::replicate::{self, UnitOptions, UnitResult};
use crate::store::{ProgressStatus, ProgressStore, WindowSpec};
use crate::{msg_info, msg_warning};

/// The worker ceiling recommended in the streamer's own help text. Raising
/// it is allowed but not encouraged: every worker contends for the same
/// table-level lock taken by the Loader's bulk insert.
pub const RECOMMENDED_MAX_WORKERS: usize = 2;

#[derive(Debug, Clone)]
pub struct StreamerOptions {
    pub max_workers: usize,
    pub resume: bool,
    pub params: LoadParams,
}

impl Default for StreamerOptions {
    fn default() -> Self {
        Self { max_workers: RECOMMENDED_MAX_WORKERS, resume: false, params: LoadParams::default() }
    }
}

/// Splits `[start, end)` into `[YYYY-MM-01, next-month-01)` half-open
/// windows. `start`/`end` need not themselves fall on month boundaries; the
/// first and last windows are clipped to the requested range.
pub fn month_windows(start: NaiveDate, end: NaiveDate) -> Vec<WindowSpec> {
    if start >= end {
        return Vec::new();
    }
    let mut windows = Vec::new();
    let mut cursor = NaiveDate::from_ymd_opt(start.year(), start.month(), 1).unwrap();
    while cursor < end {
        let next_month = if cursor.month() == 12 {
            NaiveDate::from_ymd_opt(cursor.year() + 1, 1, 1).unwrap()
        } else {
            NaiveDate::from_ymd_opt(cursor.year(), cursor.month() + 1, 1).unwrap()
        };
        let window_start = cursor.max(start);
        let window_end = next_month.min(end);
        windows.push(WindowSpec::DateRange { start: window_start, end: window_end });
        cursor = next_month;
    }
    windows
}

type SourceConnector = Arc<dyn Fn() -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Client<Compat<TcpStream>>, EtlError>> + Send>> + Send + Sync>;

/// Runs a bounded pool of workers over `[range_start, range_end)` for
/// `table`. Each worker owns its own source connection, built on demand via
/// `connect_source` - the source pool is per-worker, never shared.
pub async fn run(
    target: PgPool,
    progress: ProgressStore,
    catalog: Arc<SchemaCatalog>,
    table: String,
    range_start: NaiveDate,
    range_end: NaiveDate,
    job_date: NaiveDate,
    options: StreamerOptions,
    connect_source: SourceConnector,
) -> Result<Vec<UnitResult>, EtlError> {
    let effective_workers = options.max_workers.max(1);
    if effective_workers > RECOMMENDED_MAX_WORKERS {
        msg_warning!(Message::StreamerWorkerCountAboveRecommended { requested: effective_workers, recommended: RECOMMENDED_MAX_WORKERS });
    }

    let mut windows = month_windows(range_start, range_end);
    if options.resume {
        let mut kept = Vec::with_capacity(windows.len());
        for window in windows {
            match progress.latest_status(&table, &window).await? {
                Some(ProgressStatus::Completed) => continue,
                _ => kept.push(window),
            }
        }
        windows = kept;
    }
    msg_info!(Message::StreamerWindowsPlanned { table: table.clone(), count: windows.len() });

    let queue = Arc::new(Mutex::new(windows.into_iter()));
    let mut join_set: JoinSet<Result<Vec<UnitResult>, EtlError>> = JoinSet::new();

    for _ in 0..effective_workers {
        let queue = Arc::clone(&queue);
        let connect_source = Arc::clone(&connect_source);
        let target = target.clone();
        let progress = progress.clone();
        let catalog = Arc::clone(&catalog);
        let table = table.clone();
        let params = options.params;

        join_set.spawn(async move {
            let mut results = Vec::new();
            loop {
                let next = queue.lock().await.next();
                let Some(window) = next else { break };
                let mut source = connect_source().await?;
                let result = replicate::replicate_unit(
                    &mut source,
                    &target,
                    &progress,
                    &catalog,
                    &table,
                    job_date,
                    window,
                    params,
                    UnitOptions { skip_existing: false },
                )
                .await?;
                results.push(result);
            }
            Ok(results)
        });
    }

    let mut all_results = Vec::new();
    let mut first_error = None;
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(Ok(results)) => all_results.extend(results),
            Ok(Err(e)) => {
                first_error.get_or_insert(e);
            }
            Err(join_err) => {
                first_error.get_or_insert(EtlError::Cancelled);
                tracing::error!(%join_err, "streamer worker task panicked");
            }
        };
    }

    if let Some(err) = first_error {
        return Err(err);
    }
    Ok(all_results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn month_windows_splits_on_calendar_boundaries() {
        let windows = month_windows(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(windows.len(), 3);
        assert_eq!(
            windows[0],
            WindowSpec::DateRange { start: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() }
        );
        assert_eq!(
            windows[2],
            WindowSpec::DateRange { start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(), end: NaiveDate::from_ymd_opt(2024, 4, 1).unwrap() }
        );
    }

    #[test]
    fn month_windows_clips_partial_first_and_last_months() {
        let windows = month_windows(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), NaiveDate::from_ymd_opt(2024, 2, 10).unwrap());
        assert_eq!(windows.len(), 2);
        assert_eq!(
            windows[0],
            WindowSpec::DateRange { start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), end: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() }
        );
        assert_eq!(
            windows[1],
            WindowSpec::DateRange { start: NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(), end: NaiveDate::from_ymd_opt(2024, 2, 10).unwrap() }
        );
    }

    #[test]
    fn month_windows_handles_december_year_rollover() {
        let windows = month_windows(NaiveDate::from_ymd_opt(2023, 12, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 31).unwrap());
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[1].tag(), "2024-01-01..2024-01-31");
    }

    #[test]
    fn empty_range_produces_no_windows() {
        let windows = month_windows(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 1).unwrap());
        assert!(windows.is_empty());
    }
}
