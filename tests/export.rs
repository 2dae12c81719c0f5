#[cfg(test)]
mod tests {
    use replica_etl::export::ExportManifest;
    use chrono::Utc;

    /// The sidecar manifest's field set mirrors the persisted-state layout:
    /// table, window bounds, row count, write timestamp, and source column
    /// names, so an operator can audit an export without opening the
    /// Parquet file itself.
    #[test]
    fn manifest_round_trips_through_json_with_expected_fields() {
        let manifest = ExportManifest {
            table: "APP_4_SALES".to_string(),
            window_start: "2024-01-15".to_string(),
            window_end: "2024-01-16".to_string(),
            row_count: 12_034,
            written_at: Utc::now(),
            source_columns: vec!["SALE_ID".to_string(), "DATETIME__SALES_DATE".to_string()],
        };

        let json = serde_json::to_value(&manifest).unwrap();
        assert_eq!(json["table"], "APP_4_SALES");
        assert_eq!(json["row_count"], 12_034);
        assert_eq!(json["source_columns"][0], "SALE_ID");
    }
}
