//! Parquet export mode: one file per (table, window) under
//! `<output-dir>/<table>/<window-tag>.parquet`, with a sidecar JSON
//! manifest. The default streaming mode (used by the Replication Driver)
//! writes nothing to disk; this module is only invoked when
//! `--full-table-mode parquet` is requested.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parquet::basic::{Compression, Type as PhysicalType};
use parquet::column::writer::ColumnWriter;
use parquet::data_type::ByteArray;
use parquet::file::properties::WriterProperties;
use parquet::file::writer::SerializedFileWriter;
use parquet::schema::types::{Type as SchemaType, TypePtr};
use serde::Serialize;
use tiberius::Row as SourceRow;

use crate::catalog::{ColumnDescriptor, NativeTypeCategory};
use crate::libs::error::EtlError;
use crate::libs::messages::Message;
use crate::store::WindowSpec;
use crate::{msg_info, msg_success};

/// Sidecar JSON manifest written alongside every Parquet file.
#[derive(Debug, Serialize)]
pub struct ExportManifest {
    pub table: String,
    pub window_start: String,
    pub window_end: String,
    pub row_count: u64,
    pub written_at: DateTime<Utc>,
    pub source_columns: Vec<String>,
}

/// Builds the Parquet schema for `columns`. Every column is written as an
/// optional UTF8 byte array; [`column_value_as_string`] reads each source
/// value through its native type and formats it, so this stays a text
/// rendering of correctly-typed values rather than a string column read.
fn schema_for_columns(columns: &[ColumnDescriptor]) -> Result<TypePtr, EtlError> {
    let fields: Result<Vec<TypePtr>, EtlError> = columns
        .iter()
        .map(|c| {
            SchemaType::primitive_type_builder(&c.name, PhysicalType::BYTE_ARRAY)
                .with_logical_type(Some(parquet::basic::LogicalType::String))
                .with_repetition(if c.nullable { parquet::basic::Repetition::OPTIONAL } else { parquet::basic::Repetition::REQUIRED })
                .build()
                .map(Arc::new)
                .map_err(|e| EtlError::Configuration(format!("parquet schema build failed: {}", e)))
        })
        .collect();

    SchemaType::group_type_builder("schema")
        .with_fields(fields?)
        .build()
        .map(Arc::new)
        .map_err(|e| EtlError::Configuration(format!("parquet schema build failed: {}", e)))
}

fn window_file_path(output_dir: &Path, table: &str, window: &WindowSpec) -> PathBuf {
    output_dir.join(table).join(format!("{}.parquet", window.tag()))
}

/// Reads `row`'s value at `col_index` through the Rust type matching its
/// catalog native type and formats it as text. Reading every column as
/// `&str` regardless of native type panics on the first non-string column.
fn column_value_as_string(row: &SourceRow, col_index: usize, category: NativeTypeCategory) -> Option<String> {
    match category {
        NativeTypeCategory::Integer => row.get::<i32, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::BigInt => row.get::<i64, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::SmallInt => row.get::<i16, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::TinyInt => row.get::<u8, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::Boolean => row.get::<bool, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::Float => row.get::<f64, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::Decimal => row.get::<rust_decimal::Decimal, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::Date => row.get::<chrono::NaiveDate, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::DateTime => row.get::<chrono::NaiveDateTime, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::Uuid => row.get::<uuid::Uuid, usize>(col_index).map(|v| v.to_string()),
        NativeTypeCategory::Text => row.get::<&str, usize>(col_index).map(str::to_owned),
    }
}

/// Writes every batch for `(table, window)` into one Parquet file, then the
/// sidecar manifest. Column order matches catalog order.
pub fn write_table_parquet(output_dir: &Path, table: &str, window: &WindowSpec, columns: &[ColumnDescriptor], batches: &[Vec<SourceRow>]) -> Result<u64, EtlError> {
    let path = window_file_path(output_dir, table, window);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| EtlError::Configuration(format!("cannot create {}: {}", parent.display(), e)))?;
    }
    msg_info!(Message::ExportWritingParquet { table: table.to_string(), path: path.display().to_string() });

    let schema = schema_for_columns(columns)?;
    let props = Arc::new(WriterProperties::builder().set_compression(Compression::SNAPPY).build());
    let file = File::create(&path).map_err(|e| EtlError::Configuration(format!("cannot create {}: {}", path.display(), e)))?;
    let mut writer = SerializedFileWriter::new(file, schema, props).map_err(|e| EtlError::Configuration(format!("parquet writer init failed: {}", e)))?;

    let all_rows: Vec<&SourceRow> = batches.iter().flatten().collect();

    let mut row_group_writer = writer.next_row_group().map_err(|e| EtlError::Configuration(format!("parquet row group failed: {}", e)))?;
    for (col_index, column) in columns.iter().enumerate() {
        let mut col_writer = row_group_writer
            .next_column()
            .map_err(|e| EtlError::Configuration(format!("parquet column writer failed: {}", e)))?
            .ok_or_else(|| EtlError::Configuration(format!("no column writer for {}", column.name)))?;

        let category = column.category();
        let values: Vec<ByteArray> = all_rows
            .iter()
            .filter_map(|row| column_value_as_string(row, col_index, category).map(|s| ByteArray::from(s.into_bytes())))
            .collect();
        let def_levels: Option<Vec<i16>> = if column.nullable {
            Some(all_rows.iter().map(|row| if column_value_as_string(row, col_index, category).is_some() { 1 } else { 0 }).collect())
        } else {
            None
        };

        match col_writer.untyped() {
            ColumnWriter::ByteArrayColumnWriter(typed) => {
                typed
                    .write_batch(&values, def_levels.as_deref(), None)
                    .map_err(|e| EtlError::Configuration(format!("parquet write_batch failed for {}: {}", column.name, e)))?;
            }
            _ => return Err(EtlError::Configuration(format!("unexpected column writer kind for {}", column.name))),
        }
        col_writer.close().map_err(|e| EtlError::Configuration(format!("parquet column close failed: {}", e)))?;
    }
    row_group_writer.close().map_err(|e| EtlError::Configuration(format!("parquet row group close failed: {}", e)))?;
    writer.close().map_err(|e| EtlError::Configuration(format!("parquet writer close failed: {}", e)))?;
    let row_count = all_rows.len() as u64;

    let (window_start, window_end) = window.as_db_strings();
    let manifest = ExportManifest {
        table: table.to_string(),
        window_start,
        window_end,
        row_count,
        written_at: Utc::now(),
        source_columns: columns.iter().map(|c| c.name.clone()).collect(),
    };
    write_manifest(&path, &manifest)?;

    msg_success!(Message::ExportCompleted { table: table.to_string(), rows: row_count });
    Ok(row_count)
}

fn write_manifest(parquet_path: &Path, manifest: &ExportManifest) -> Result<(), EtlError> {
    let manifest_path = parquet_path.with_extension("manifest.json");
    let file = File::create(&manifest_path).map_err(|e| EtlError::Configuration(format!("cannot create {}: {}", manifest_path.display(), e)))?;
    serde_json::to_writer_pretty(file, manifest).map_err(|e| EtlError::Configuration(format!("cannot write manifest {}: {}", manifest_path.display(), e)))?;
    msg_info!(Message::ExportManifestWritten(manifest_path.display().to_string()));
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn window_file_path_uses_table_dir_and_window_tag() {
        let window = WindowSpec::DateRange { start: chrono::NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), end: chrono::NaiveDate::from_ymd_opt(2024, 2, 1).unwrap() };
        let path = window_file_path(Path::new("/tmp/exports"), "APP_4_SALES", &window);
        assert_eq!(path, PathBuf::from("/tmp/exports/APP_4_SALES/2024-01-01..2024-02-01.parquet"));
    }

    #[test]
    fn full_table_window_uses_sentinel_file_name() {
        let path = window_file_path(Path::new("/tmp/exports"), "LOCATION_DETAIL", &WindowSpec::FullTable);
        assert_eq!(path, PathBuf::from("/tmp/exports/LOCATION_DETAIL/full-table.parquet"));
    }

    #[test]
    fn schema_for_columns_marks_nullable_columns_optional() {
        let columns = vec![
            ColumnDescriptor { name: "ID".into(), native_type: "int".into(), max_length: None, nullable: false, primary_key: true },
            ColumnDescriptor { name: "NAME".into(), native_type: "varchar".into(), max_length: Some(50), nullable: true, primary_key: false },
        ];
        let schema = schema_for_columns(&columns).unwrap();
        let group = schema.get_fields();
        assert_eq!(group[0].get_basic_info().repetition(), parquet::basic::Repetition::REQUIRED);
        assert_eq!(group[1].get_basic_info().repetition(), parquet::basic::Repetition::OPTIONAL);
    }
}
