//! Extractor: produces a lazy, finite sequence of row batches for one
//! (table, window), with network retry/backoff and mid-stream resume via a
//! checkpoint carried in the progress row.

use async_stream::try_stream;
use futures::{Stream, TryStreamExt};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tiberius::{Client, Row};
use tokio::net::TcpStream;
use tokio_util::compat::Compat;

use crate::catalog::{ColumnDescriptor, Resumability, SchemaCatalog};
use crate::libs::error::EtlError;
use crate::libs::retry::{jittered_delay, MAX_ATTEMPTS};
use crate::store::WindowSpec;

/// The last emitted row's ordering key, persisted so a mid-stream failure
/// can resume without re-reading rows already loaded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractCheckpoint {
    pub last_key: Value,
}

/// Builds the `SELECT ... ORDER BY ...` statement for one (table, window),
/// in the exact column order the catalog returns - the same order the
/// Loader's INSERT column list uses.
pub fn build_query(catalog: &SchemaCatalog, table: &str, window: &WindowSpec, resumability: Resumability, resume_from: Option<&ExtractCheckpoint>) -> Result<String, EtlError> {
    let columns = catalog.columns(table)?;
    let column_list = column_list_sql(columns);

    let mut clauses = Vec::new();
    if let WindowSpec::DateRange { start, end } = window {
        let date_column = catalog
            .date_filter_column(table)
            .ok_or_else(|| EtlError::Configuration(format!("{} has no date-filter column but a date window was requested", table)))?;
        clauses.push(format!("[{}] >= '{}'", date_column, start));
        clauses.push(format!("[{}] < '{}'", date_column, end));
    }

    let order_by = order_column_for(catalog, table, resumability)?.map(|c| c.name.clone());

    if let (Some(order_col), Some(checkpoint)) = (&order_by, resume_from) {
        if let Some(last_key) = checkpoint.last_key.as_str() {
            clauses.push(format!("[{}] > '{}'", order_col, last_key));
        }
    }

    let mut query = format!("SELECT {} FROM [{}]", column_list, table);
    if !clauses.is_empty() {
        query.push_str(" WHERE ");
        query.push_str(&clauses.join(" AND "));
    }
    if let Some(order_col) = &order_by {
        query.push_str(&format!(" ORDER BY [{}]", order_col));
    }
    Ok(query)
}

fn column_list_sql(columns: &[ColumnDescriptor]) -> String {
    columns.iter().map(|c| format!("[{}]", c.name)).collect::<Vec<_>>().join(", ")
}

/// The column `build_query`'s `ORDER BY` clause uses for `table`, matching
/// its resumability: the date-filter column when windowed, the primary key
/// for an unwindowed but keyed table, or none. The Replication Driver reuses
/// this to know which column a commit-boundary checkpoint should track.
pub fn order_column_for<'a>(catalog: &'a SchemaCatalog, table: &str, resumability: Resumability) -> Result<Option<&'a ColumnDescriptor>, EtlError> {
    let columns = catalog.columns(table)?;
    Ok(match resumability {
        Resumability::DateWindowed => {
            let name = catalog.date_filter_column(table);
            name.and_then(|n| columns.iter().find(|c| c.name == n))
        }
        Resumability::FullTableOrderedByPk => columns.iter().find(|c| c.primary_key),
        Resumability::FullTableUnordered => None,
    })
}

/// Opens the streaming cursor, retrying transient connection faults with
/// jittered backoff before the first row is read.
pub async fn open_cursor<'a>(client: &'a mut Client<Compat<TcpStream>>, query: &'a str) -> Result<tiberius::QueryStream<'a>, EtlError> {
    // `QueryStream<'a>` borrows `client` for the function's full input
    // lifetime, which the borrow checker cannot reconcile with retrying the
    // borrow across an `.await` (each retry would need its own exclusive
    // reborrow, but a failed attempt's borrow is pinned to `'a` by the
    // success-path return type). A raw pointer sidesteps that: each loop
    // iteration derives a fresh `&'a mut` from it, and only one such
    // reference is ever live at a time (a failed attempt's reference is
    // dropped before the next iteration creates another; a successful
    // attempt's reference is returned immediately and the loop exits).
    struct SendPtr<T>(*mut T);
    // SAFETY: the pointee (`Client<Compat<TcpStream>>`) is itself `Send`; the
    // raw pointer only loses that marker because `*mut T` opts out of it by
    // default. Moving this pointer across an `.await` moves no more than the
    // underlying `&mut Client` would.
    unsafe impl<T: Send> Send for SendPtr<T> {}

    let client_ptr = SendPtr(client as *mut Client<Compat<TcpStream>>);
    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let client_ref: &'a mut Client<Compat<TcpStream>> = unsafe { &mut *client_ptr.0 };
        match client_ref.simple_query(query).await.map_err(|e| EtlError::SourceUnavailable(e.into())) {
            Ok(stream) => return Ok(stream),
            Err(err) if attempt < MAX_ATTEMPTS && err.is_transient() => {
                let delay = jittered_delay(attempt);
                tracing::warn!(operation = "extract-open-cursor", attempt, delay_ms = delay.as_millis() as u64, error = %err, "retrying after transient failure");
                tokio::time::sleep(delay).await;
            }
            Err(err) => return Err(err),
        }
    }
}

/// Drains `stream` into batches of at most `chunk_size` rows, in catalog
/// column order. The returned stream is consumed exactly once; restart
/// semantics belong to the (table, window) work unit, not this iterator.
pub fn batches<'a>(mut stream: tiberius::QueryStream<'a>, chunk_size: usize) -> impl Stream<Item = Result<Vec<Row>, EtlError>> + 'a {
    try_stream! {
        let mut batch = Vec::with_capacity(chunk_size);
        while let Some(item) = stream.try_next().await.map_err(|e| EtlError::SourceUnavailable(e.into()))? {
            if let tiberius::QueryItem::Row(row) = item {
                batch.push(row);
                if batch.len() >= chunk_size {
                    yield std::mem::replace(&mut batch, Vec::with_capacity(chunk_size));
                }
            }
        }
        if !batch.is_empty() {
            yield batch;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::ColumnDescriptor;
    use chrono::NaiveDate;

    fn test_catalog() -> SchemaCatalog {
        let json = serde_json::json!({
            "tables": {
                "APP_4_SALES": {
                    "columns": [
                        {"name": "SALE_ID", "native_type": "bigint", "max_length": null, "nullable": false, "primary_key": true},
                        {"name": "DATETIME__SALES_DATE", "native_type": "datetime", "max_length": null, "nullable": false}
                    ]
                }
            }
        });
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn date_window_query_includes_half_open_bounds() {
        let catalog = test_catalog();
        let window = WindowSpec::DateRange {
            start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap(),
        };
        let query = build_query(&catalog, "APP_4_SALES", &window, Resumability::DateWindowed, None).unwrap();
        assert!(query.contains(">= '2024-01-15'"));
        assert!(query.contains("< '2024-01-16'"));
        assert!(query.contains("ORDER BY [DATETIME__SALES_DATE]"));
    }

    #[test]
    fn full_table_unordered_has_no_order_by_clause() {
        let catalog = test_catalog();
        let query = build_query(&catalog, "APP_4_SALES", &WindowSpec::FullTable, Resumability::FullTableUnordered, None).unwrap();
        assert!(!query.contains("ORDER BY"));
    }

    #[test]
    fn resume_checkpoint_adds_strictly_greater_than_predicate() {
        let catalog = test_catalog();
        let checkpoint = ExtractCheckpoint {
            last_key: serde_json::Value::String("2024-01-15T08:00:00".to_string()),
        };
        let query = build_query(
            &catalog,
            "APP_4_SALES",
            &WindowSpec::FullTable,
            Resumability::DateWindowed,
            Some(&checkpoint),
        )
        .unwrap();
        assert!(query.contains("> '2024-01-15T08:00:00'"));
    }

    #[test]
    fn order_column_for_picks_date_filter_then_primary_key_then_none() {
        let catalog = test_catalog();
        let date_windowed = order_column_for(&catalog, "APP_4_SALES", Resumability::DateWindowed).unwrap();
        assert_eq!(date_windowed.unwrap().name, "DATETIME__SALES_DATE");

        let pk_ordered = order_column_for(&catalog, "APP_4_SALES", Resumability::FullTableOrderedByPk).unwrap();
        assert_eq!(pk_ordered.unwrap().name, "SALE_ID");

        let unordered = order_column_for(&catalog, "APP_4_SALES", Resumability::FullTableUnordered).unwrap();
        assert!(unordered.is_none());
    }

    #[test]
    fn column_list_preserves_catalog_order() {
        let columns = vec![
            ColumnDescriptor { name: "B".into(), native_type: "int".into(), max_length: None, nullable: true, primary_key: false },
            ColumnDescriptor { name: "A".into(), native_type: "int".into(), max_length: None, nullable: true, primary_key: false },
        ];
        assert_eq!(column_list_sql(&columns), "[B], [A]");
    }
}
