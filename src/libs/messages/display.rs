//! Display implementation for replica-etl application messages.
//!
//! Converts structured `Message` variants into the human-readable text shown
//! on the console and, in debug mode, routed through `tracing`. Every
//! user-facing string in the crate goes through a `Message` variant rather
//! than an inline `println!`.

use super::types::Message;
use std::fmt::{Display, Formatter, Result};

impl Display for Message {
    fn fmt(&self, f: &mut Formatter<'_>) -> Result {
        let text = match self {
            // === CONFIGURATION MESSAGES ===
            Message::ConfigLoaded => "Configuration loaded from environment".to_string(),
            Message::ConfigFileNotFound(path) => format!("Configuration file not found: {}", path),
            Message::ConfigMissingVar(name) => format!("Missing required environment variable: {}", name),
            Message::ConfigInvalidValue(name, reason) => format!("Invalid value for {}: {}", name, reason),
            Message::ConfigModuleSource => "Source endpoint settings".to_string(),
            Message::ConfigModuleTarget => "Target endpoint settings".to_string(),

            // === CATALOG MESSAGES ===
            Message::CatalogLoaded(count) => format!("Loaded schema catalog: {} table(s)", count),
            Message::CatalogLoadFailed(reason) => format!("Failed to load schema catalog: {}", reason),
            Message::UnknownTable(table) => format!("Unknown table: {}", table),
            Message::NonResumableTable(table, reason) => format!("Table {} is not resumable: {}", table, reason),
            Message::SchemaMismatchDetected { table, detail } => format!("Schema mismatch on {}: {}", table, detail),

            // === MIGRATION MESSAGES ===
            Message::MigrationsFound(count) => format!("Found {} pending database migration(s)", count),
            Message::RunningMigration(version, name) => format!("Running migration {}: {}", version, name),
            Message::MigrationCompleted(version) => format!("Migration {} completed", version),
            Message::MigrationFailed(version, error) => format!("Migration {} failed: {}", version, error),
            Message::AllMigrationsCompleted => "All database migrations completed successfully".to_string(),
            Message::DatabaseVersion(version) => format!("Current database version: {}", version),
            Message::DatabaseUpToDate => "Database schema is up to date".to_string(),
            Message::DatabaseNeedsUpdate => "Database schema needs to be updated".to_string(),
            Message::MigrationHistory => "Migration history:".to_string(),
            Message::DdlGenerated(table) => format!("Generated replica DDL for {}", table),

            // === PROGRESS / WORK UNIT MESSAGES ===
            Message::WorkUnitClaimed { table, window } => format!("Claimed work unit {} / {}", table, window),
            Message::WorkUnitBusy { table, window } => format!("Work unit {} / {} is already running", table, window),
            Message::WorkUnitCompleted { table, window, rows } => {
                format!("Completed {} / {}: {} row(s)", table, window, rows)
            }
            Message::WorkUnitFailed { table, window, error } => format!("Failed {} / {}: {}", table, window, error),
            Message::WorkUnitInterrupted { table, window } => format!("Interrupted {} / {}", table, window),
            Message::WorkUnitResuming { table, window } => format!("Resuming {} / {} from last checkpoint", table, window),
            Message::OrphanedUnitsReclaimed(count) => format!("Reclaimed {} orphaned work unit(s)", count),

            // === EXTRACT MESSAGES ===
            Message::ExtractStarted { table, window } => format!("Extracting {} / {}", table, window),
            Message::ExtractBatchFetched { table, rows } => format!("Fetched {} row(s) from {}", rows, table),
            Message::ExtractRetrying { table, attempt, delay_ms } => {
                format!("Retrying extract of {} (attempt {}, backing off {}ms)", table, attempt, delay_ms)
            }
            Message::ExtractResumedFromCheckpoint { table, offset } => {
                format!("Resuming extract of {} from checkpoint {}", table, offset)
            }
            Message::SourceUnavailable(detail) => format!("Source database unavailable: {}", detail),

            // === LOAD MESSAGES ===
            Message::LoadDeletingExisting { table, window } => {
                format!("Deleting existing rows for {} / {}", table, window)
            }
            Message::LoadInserted { table, rows } => format!("Inserted {} row(s) into {}", rows, table),
            Message::LoadIndexesDropped(table) => format!("Dropped secondary indexes on {}", table),
            Message::LoadIndexesRebuilt(table) => format!("Rebuilt secondary indexes on {}", table),
            Message::LoadDuplicateKeyDetected { table, detail } => {
                format!("Duplicate key detected while loading {}: {}", table, detail)
            }
            Message::TargetUnavailable(detail) => format!("Target database unavailable: {}", detail),

            // === REPLICATION DRIVER MESSAGES ===
            Message::ReplicationUnitStarted { table, window } => format!("Replicating {} / {}", table, window),
            Message::ReplicationUnitSkippedExisting { table, window } => {
                format!("Skipping {} / {} (already completed)", table, window)
            }
            Message::ReplicationUnitSucceeded { table, window, rows, elapsed_ms } => {
                format!("{} / {}: {} row(s) in {}ms", table, window, rows, elapsed_ms)
            }
            Message::ReplicationUnitFailed { table, window, error } => {
                format!("{} / {}: failed - {}", table, window, error)
            }

            // === MONTHLY STREAMER MESSAGES ===
            Message::StreamerWindowsPlanned { table, count } => format!("Planned {} window(s) for {}", count, table),
            Message::StreamerWorkerStarted(slot) => format!("Worker {} started", slot),
            Message::StreamerWorkerCountAboveRecommended { requested, recommended } => {
                format!("Worker count {} exceeds the recommended ceiling of {}; target-side lock contention is more likely", requested, recommended)
            }
            Message::StreamerProgress { table, done, total } => format!("{}: {}/{} windows done", table, done, total),
            Message::StreamerCompleted { table, succeeded, failed } => {
                format!("{}: {} succeeded, {} failed", table, succeeded, failed)
            }

            // === DAILY ORCHESTRATOR MESSAGES ===
            Message::OrchestratorPassStarted(pass) => format!("Starting {} pass", pass),
            Message::OrchestratorPassCompleted { pass, succeeded, failed } => {
                format!("{} pass complete: {} succeeded, {} failed", pass, succeeded, failed)
            }
            Message::OrchestratorRunRecorded(run_id) => format!("Recorded run history entry {}", run_id),

            // === EXPORT MESSAGES ===
            Message::ExportWritingParquet { table, path } => format!("Writing {} to {}", table, path),
            Message::ExportManifestWritten(path) => format!("Wrote export manifest to {}", path),
            Message::ExportCompleted { table, rows } => format!("Exported {} row(s) from {}", rows, table),

            // === CLI SUMMARY MESSAGES ===
            Message::RunSummaryHeader(run_id) => format!("Run {}", run_id),
            Message::TableResultLine { table, window, success, rows } => {
                let status = if *success { "ok" } else { "FAILED" };
                format!("{:<32} {:<16} {:<8} {} row(s)", table, window, status, rows)
            }
            Message::RunFailedTables(count) => format!("{} table(s) failed", count),
            Message::RunCompletedCleanly => "All tables completed successfully".to_string(),
            Message::Cancelled => "Run cancelled".to_string(),

            // === GENERAL MESSAGES ===
            Message::OperationCompleted => "Operation completed successfully".to_string(),
            Message::OperationCancelled => "Operation cancelled".to_string(),
            Message::InvalidInput(detail) => format!("Invalid input: {}", detail),
        };

        write!(f, "{}", text)
    }
}
