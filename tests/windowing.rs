#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use replica_etl::catalog::{Resumability, SchemaCatalog};
    use replica_etl::extract::build_query;
    use replica_etl::store::WindowSpec;
    use replica_etl::streamer::month_windows;

    fn catalog_with_sales() -> SchemaCatalog {
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

    /// A window spanning exactly one day boundary includes rows with
    /// `date_column >= start` and excludes `date_column >= end`.
    #[test]
    fn single_day_window_uses_half_open_bounds() {
        let catalog = catalog_with_sales();
        let window = WindowSpec::DateRange { start: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), end: NaiveDate::from_ymd_opt(2024, 1, 16).unwrap() };
        let query = build_query(&catalog, "APP_4_SALES", &window, Resumability::DateWindowed, None).unwrap();
        assert!(query.contains(">= '2024-01-15'"));
        assert!(query.contains("< '2024-01-16'"));
    }

    /// Three consecutive calendar months produce three disjoint windows
    /// whose bounds abut exactly, so no source row can fall in two windows.
    #[test]
    fn monthly_backfill_windows_are_contiguous_and_disjoint() {
        let windows = month_windows(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), NaiveDate::from_ymd_opt(2024, 4, 1).unwrap());
        assert_eq!(windows.len(), 3);
        for pair in windows.windows(2) {
            let (WindowSpec::DateRange { end: prev_end, .. }, WindowSpec::DateRange { start: next_start, .. }) = (&pair[0], &pair[1]) else {
                panic!("expected date ranges");
            };
            assert_eq!(prev_end, next_start, "windows must abut with no gap or overlap");
        }
    }

    /// A single-day range still produces exactly one window, clipped to
    /// that day rather than expanding to the full month.
    #[test]
    fn single_day_range_produces_one_clipped_window() {
        let windows = month_windows(NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 16).unwrap());
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].tag(), "2024-01-15..2024-01-16");
    }
}
