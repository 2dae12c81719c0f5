//! Migration Applier: applies the ordered `migrations/` directory to the
//! target and generates the replica table DDL from the cached schema
//! catalog.

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::PgPool;
use std::path::Path;

use crate::catalog::SchemaCatalog;
use crate::libs::error::EtlError;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Applies every migration in `migrations/` that hasn't already run,
/// recorded via `sqlx::migrate!`'s own checksum-tracking table.
pub async fn apply(pool: &PgPool) -> Result<(), EtlError> {
    MIGRATOR.run(pool).await.map_err(map_migrate_error)
}

/// Pending migration count, for the debug-only `migrations status` command.
pub async fn pending_count(pool: &PgPool) -> Result<usize, EtlError> {
    let applied: Vec<i64> = sqlx::query_scalar("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await
        .unwrap_or_default();
    let applied: std::collections::HashSet<i64> = applied.into_iter().collect();
    Ok(MIGRATOR.iter().filter(|m| !applied.contains(&m.version)).count())
}

/// Migration versions in the order `sqlx::migrate!` discovered them, for
/// tests and operator tooling that don't need a live connection.
pub fn migration_versions() -> Vec<i64> {
    MIGRATOR.iter().map(|m| m.version).collect()
}

fn map_migrate_error(err: MigrateError) -> EtlError {
    EtlError::Configuration(format!("migration failed: {}", err))
}

/// Maps a catalog native type to its Postgres column type. Intentionally
/// conservative: anything unrecognized falls back to `text` rather than
/// guessing a narrower type that could truncate data.
fn postgres_type_for(native_type: &str, max_length: Option<u32>) -> String {
    match native_type.to_ascii_lowercase().as_str() {
        "int" | "integer" => "integer".to_string(),
        "bigint" => "bigint".to_string(),
        "smallint" | "tinyint" => "smallint".to_string(),
        "bit" | "boolean" | "bool" => "boolean".to_string(),
        "float" | "real" => "double precision".to_string(),
        "decimal" | "numeric" | "money" | "smallmoney" => "numeric".to_string(),
        "date" => "date".to_string(),
        "datetime" | "datetime2" | "smalldatetime" | "timestamp" => "timestamp".to_string(),
        "varchar" | "nvarchar" | "char" | "nchar" => match max_length {
            Some(len) if len > 0 && len <= 10_000 => format!("varchar({})", len),
            _ => "text".to_string(),
        },
        "text" | "ntext" => "text".to_string(),
        "uniqueidentifier" => "uuid".to_string(),
        _ => "text".to_string(),
    }
}

/// Generates `CREATE TABLE IF NOT EXISTS` DDL for every table in `catalog`,
/// used to seed `migrations/0001_replica_tables.sql` content ahead of time.
/// Idempotent by construction, via `CREATE TABLE IF NOT EXISTS`.
pub fn generate_replica_ddl(catalog: &SchemaCatalog) -> Result<String, EtlError> {
    let mut ddl = String::new();
    for table in catalog.table_names() {
        let target = catalog.target_table_name(table);
        let columns = catalog.columns(table)?;
        let mut column_defs = Vec::with_capacity(columns.len());
        for column in columns {
            let pg_type = postgres_type_for(&column.native_type, column.max_length);
            let nullability = if column.nullable { "" } else { " NOT NULL" };
            column_defs.push(format!("    \"{}\" {}{}", column.name, pg_type, nullability));
        }
        ddl.push_str(&format!(
            "CREATE TABLE IF NOT EXISTS \"{}\" (\n{}\n);\n\n",
            target,
            column_defs.join(",\n")
        ));
    }
    Ok(ddl)
}

/// Writes `generate_replica_ddl`'s output to `path`, for operators
/// regenerating `0001_replica_tables.sql` after a schema dump refresh.
pub fn write_replica_ddl(catalog: &SchemaCatalog, path: &Path) -> Result<(), EtlError> {
    let ddl = generate_replica_ddl(catalog)?;
    std::fs::write(path, ddl).map_err(|e| EtlError::Configuration(format!("cannot write {}: {}", path.display(), e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn postgres_type_for_maps_common_native_types() {
        assert_eq!(postgres_type_for("int", None), "integer");
        assert_eq!(postgres_type_for("varchar", Some(50)), "varchar(50)");
        assert_eq!(postgres_type_for("nvarchar", Some(20_000)), "text");
        assert_eq!(postgres_type_for("bit", None), "boolean");
        assert_eq!(postgres_type_for("some_exotic_type", None), "text");
    }
}
