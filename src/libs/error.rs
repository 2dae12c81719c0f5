//! Typed error taxonomy for the replication engine.
//!
//! Component boundaries (config, catalog, extract, load, replicate) return
//! `EtlError`; the CLI layer wraps it in `anyhow::Error` at the point where
//! it becomes a user-facing exit code.

#[derive(Debug, thiserror::Error)]
pub enum EtlError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("unknown table {0}")]
    UnknownTable(String),

    #[error("schema mismatch on {table}: {detail}")]
    SchemaMismatch { table: String, detail: String },

    #[error("source unavailable: {0}")]
    SourceUnavailable(#[source] anyhow::Error),

    #[error("target unavailable: {0}")]
    TargetUnavailable(#[source] anyhow::Error),

    #[error("source integrity violation on {table}: {detail}")]
    SourceIntegrity { table: String, detail: String },

    #[error("work unit busy: {table} {window}")]
    WorkUnitBusy { table: String, window: String },

    #[error("cancelled")]
    Cancelled,

    #[error("load failed: {0}")]
    LoadFailed(#[source] anyhow::Error),
}

impl EtlError {
    /// Whether retrying the operation that produced this error might succeed.
    ///
    /// Used by [`crate::libs::retry::with_backoff`] callers to decide whether
    /// to keep retrying or to surface the error immediately.
    pub fn is_transient(&self) -> bool {
        matches!(self, EtlError::SourceUnavailable(_) | EtlError::TargetUnavailable(_))
    }
}
