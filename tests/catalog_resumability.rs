#[cfg(test)]
mod tests {
    use replica_etl::catalog::{Resumability, SchemaCatalog};
    use std::io::Write;

    fn write_dump(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    /// Column fidelity: the replica column list equals the cached catalog's
    /// ordered list, independent of any runtime reordering.
    #[test]
    fn columns_and_target_name_are_consistent_across_repeated_calls() {
        let file = write_dump(
            r#"{"tables": {"LOCATION_DETAIL": {"columns": [
                {"name": "ID", "native_type": "int", "max_length": null, "nullable": false, "primary_key": true},
                {"name": "NAME", "native_type": "varchar", "max_length": 100, "nullable": true},
                {"name": "REGION", "native_type": "varchar", "max_length": 50, "nullable": true}
            ]}}}"#,
        );
        let catalog = SchemaCatalog::load(file.path()).unwrap();

        let first = catalog.columns("LOCATION_DETAIL").unwrap().to_vec();
        let second = catalog.columns("LOCATION_DETAIL").unwrap().to_vec();
        assert_eq!(first.iter().map(|c| c.name.clone()).collect::<Vec<_>>(), second.iter().map(|c| c.name.clone()).collect::<Vec<_>>());
        assert_eq!(catalog.target_table_name("LOCATION_DETAIL"), "com_5013_LOCATION_DETAIL");
    }

    #[test]
    fn table_with_date_column_is_date_windowed_regardless_of_primary_key() {
        let file = write_dump(
            r#"{"tables": {"APP_4_SALES": {"columns": [
                {"name": "SALE_ID", "native_type": "bigint", "max_length": null, "nullable": false}
            ]}}}"#,
        );
        let catalog = SchemaCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.resumability("APP_4_SALES").unwrap(), Resumability::DateWindowed);
    }

    #[test]
    fn table_without_date_column_or_primary_key_is_reported_not_guessed() {
        let file = write_dump(
            r#"{"tables": {"LOOKUP_CODES": {"columns": [
                {"name": "CODE", "native_type": "varchar", "max_length": 10, "nullable": false},
                {"name": "LABEL", "native_type": "varchar", "max_length": 100, "nullable": true}
            ]}}}"#,
        );
        let catalog = SchemaCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.resumability("LOOKUP_CODES").unwrap(), Resumability::FullTableUnordered);
    }
}
