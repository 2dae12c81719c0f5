//! Schema Catalog: the process-wide immutable source-of-truth for column
//! order, date-filter columns, and replica table naming.
//!
//! Loaded once from a cached schema dump (JSON) at process start and shared
//! behind an `Arc` across every extractor/loader task. No code path below
//! this module constructs a column list by any other means - extract and
//! load would otherwise be free to disagree on column order, a divergence
//! that is always a bug.

use std::collections::HashMap;
use std::path::Path;
use std::sync::LazyLock;

use serde::Deserialize;

use crate::libs::error::EtlError;

/// Fixed prefix applied to every source table name to produce its replica
/// table name (`LOCATION_DETAIL` -> `com_5013_LOCATION_DETAIL`).
pub const REPLICA_TABLE_PREFIX: &str = "com_5013_";

/// Tables known to carry a date column usable for windowed extraction,
/// keyed by source table name.
static DATE_FILTER_COLUMNS: LazyLock<HashMap<&'static str, &'static str>> = LazyLock::new(|| {
    HashMap::from([
        ("APP_4_SALES", "DATETIME__SALES_DATE"),
        ("APP_4_SALES_LINE", "DATETIME__SALES_DATE"),
        ("APP_4_PAYMENTS", "DATETIME__PAYMENT_DATE"),
    ])
});

#[derive(Debug, Clone, Deserialize)]
pub struct ColumnDescriptor {
    pub name: String,
    pub native_type: String,
    pub max_length: Option<u32>,
    pub nullable: bool,
    #[serde(default)]
    pub primary_key: bool,
}

/// Coarse bind-type grouping derived from `native_type`. Shared by the
/// Loader and the Parquet exporter so a source value is read off the wire
/// through the same type it will be written through, instead of always
/// being read as a string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NativeTypeCategory {
    Integer,
    BigInt,
    SmallInt,
    TinyInt,
    Boolean,
    Float,
    Decimal,
    Date,
    DateTime,
    Uuid,
    Text,
}

impl ColumnDescriptor {
    pub fn category(&self) -> NativeTypeCategory {
        match self.native_type.to_ascii_lowercase().as_str() {
            "int" | "integer" => NativeTypeCategory::Integer,
            "bigint" => NativeTypeCategory::BigInt,
            "smallint" => NativeTypeCategory::SmallInt,
            "tinyint" => NativeTypeCategory::TinyInt,
            "bit" | "boolean" | "bool" => NativeTypeCategory::Boolean,
            "float" | "real" => NativeTypeCategory::Float,
            "decimal" | "numeric" | "money" | "smallmoney" => NativeTypeCategory::Decimal,
            "date" => NativeTypeCategory::Date,
            "datetime" | "datetime2" | "smalldatetime" | "timestamp" => NativeTypeCategory::DateTime,
            "uniqueidentifier" => NativeTypeCategory::Uuid,
            _ => NativeTypeCategory::Text,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TableDescriptor {
    pub columns: Vec<ColumnDescriptor>,
}

/// How a table may be resumed mid-stream. Tables lacking both a date
/// column and a primary key are detected explicitly rather than guessed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resumability {
    /// Has a date-filter column; windows are arbitrary half-open ranges.
    DateWindowed,
    /// No date column, but a primary key gives a stable ORDER BY for
    /// full-table extraction and mid-stream checkpointing.
    FullTableOrderedByPk,
    /// Neither a date column nor a primary key. Full-table extraction only;
    /// a mid-stream failure must restart from zero.
    FullTableUnordered,
}

#[derive(Debug, Deserialize)]
pub struct SchemaCatalog {
    tables: HashMap<String, TableDescriptor>,
}

impl SchemaCatalog {
    /// Parses the cached schema dump at `path`. The file is a JSON object
    /// mapping each source table name to its ordered column descriptors.
    pub fn load(path: &Path) -> Result<Self, EtlError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EtlError::Configuration(format!("cannot read schema dump {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw)
            .map_err(|e| EtlError::Configuration(format!("malformed schema dump {}: {}", path.display(), e)))
    }

    /// The ordered column list for `table`, used verbatim by both the
    /// Extractor's SELECT clause and the Loader's INSERT column list.
    pub fn columns(&self, table: &str) -> Result<&[ColumnDescriptor], EtlError> {
        self.tables
            .get(table)
            .map(|t| t.columns.as_slice())
            .ok_or_else(|| EtlError::UnknownTable(table.to_string()))
    }

    /// The static date-filter column policy for `table`, if any.
    pub fn date_filter_column(&self, table: &str) -> Option<&'static str> {
        DATE_FILTER_COLUMNS.get(table).copied()
    }

    /// Deterministic source-name -> replica-name transformation.
    pub fn target_table_name(&self, table: &str) -> String {
        format!("{}{}", REPLICA_TABLE_PREFIX, table)
    }

    /// Detects how `table` may be resumed, rather than guessing.
    pub fn resumability(&self, table: &str) -> Result<Resumability, EtlError> {
        if self.date_filter_column(table).is_some() {
            return Ok(Resumability::DateWindowed);
        }
        let columns = self.columns(table)?;
        if columns.iter().any(|c| c.primary_key) {
            Ok(Resumability::FullTableOrderedByPk)
        } else {
            tracing::warn!(table, "table has neither a date-filter column nor a primary key; not resumable mid-stream");
            Ok(Resumability::FullTableUnordered)
        }
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_dump(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn columns_preserves_declared_order() {
        let file = write_dump(
            r#"{"tables": {"LOCATION_DETAIL": {"columns": [
                {"name": "ID", "native_type": "int", "max_length": null, "nullable": false, "primary_key": true},
                {"name": "NAME", "native_type": "varchar", "max_length": 100, "nullable": true}
            ]}}}"#,
        );
        let catalog = SchemaCatalog::load(file.path()).unwrap();
        let columns = catalog.columns("LOCATION_DETAIL").unwrap();
        assert_eq!(columns[0].name, "ID");
        assert_eq!(columns[1].name, "NAME");
    }

    #[test]
    fn unknown_table_is_reported_explicitly() {
        let file = write_dump(r#"{"tables": {}}"#);
        let catalog = SchemaCatalog::load(file.path()).unwrap();
        assert!(matches!(catalog.columns("GHOST"), Err(EtlError::UnknownTable(_))));
    }

    #[test]
    fn target_table_name_applies_fixed_prefix() {
        let file = write_dump(r#"{"tables": {}}"#);
        let catalog = SchemaCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.target_table_name("LOCATION_DETAIL"), "com_5013_LOCATION_DETAIL");
    }

    #[test]
    fn resumability_detects_unresumable_tables_instead_of_guessing() {
        let file = write_dump(
            r#"{"tables": {
                "NO_KEY_TABLE": {"columns": [{"name": "VALUE", "native_type": "varchar", "max_length": 50, "nullable": true}]},
                "PK_TABLE": {"columns": [{"name": "ID", "native_type": "int", "max_length": null, "nullable": false, "primary_key": true}]}
            }}"#,
        );
        let catalog = SchemaCatalog::load(file.path()).unwrap();
        assert_eq!(catalog.resumability("NO_KEY_TABLE").unwrap(), Resumability::FullTableUnordered);
        assert_eq!(catalog.resumability("PK_TABLE").unwrap(), Resumability::FullTableOrderedByPk);
    }

    #[test]
    fn category_groups_sql_server_native_types() {
        let column = |native_type: &str| ColumnDescriptor {
            name: "C".into(),
            native_type: native_type.into(),
            max_length: None,
            nullable: true,
            primary_key: false,
        };
        assert_eq!(column("int").category(), NativeTypeCategory::Integer);
        assert_eq!(column("bigint").category(), NativeTypeCategory::BigInt);
        assert_eq!(column("numeric").category(), NativeTypeCategory::Decimal);
        assert_eq!(column("timestamp").category(), NativeTypeCategory::DateTime);
        assert_eq!(column("datetime2").category(), NativeTypeCategory::DateTime);
        assert_eq!(column("varchar").category(), NativeTypeCategory::Text);
        assert_eq!(column("uniqueidentifier").category(), NativeTypeCategory::Uuid);
    }
}
