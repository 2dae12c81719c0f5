#[derive(Debug, Clone)]
pub enum Message {
    // === CONFIGURATION MESSAGES ===
    ConfigLoaded,
    ConfigFileNotFound(String),       // path
    ConfigMissingVar(String),         // env var name
    ConfigInvalidValue(String, String), // var name, reason
    ConfigModuleSource,
    ConfigModuleTarget,

    // === CATALOG MESSAGES ===
    CatalogLoaded(usize),       // table count
    CatalogLoadFailed(String),  // path/reason
    UnknownTable(String),       // table name
    NonResumableTable(String, String), // table, reason
    SchemaMismatchDetected {
        table: String,
        detail: String,
    },

    // === MIGRATION MESSAGES ===
    MigrationsFound(usize),        // count
    RunningMigration(i64, String), // version, name
    MigrationCompleted(i64),       // version
    MigrationFailed(i64, String),  // version, error
    AllMigrationsCompleted,
    DatabaseVersion(i64),
    DatabaseUpToDate,
    DatabaseNeedsUpdate,
    MigrationHistory,
    DdlGenerated(String), // table name

    // === PROGRESS / WORK UNIT MESSAGES ===
    WorkUnitClaimed {
        table: String,
        window: String,
    },
    WorkUnitBusy {
        table: String,
        window: String,
    },
    WorkUnitCompleted {
        table: String,
        window: String,
        rows: u64,
    },
    WorkUnitFailed {
        table: String,
        window: String,
        error: String,
    },
    WorkUnitInterrupted {
        table: String,
        window: String,
    },
    WorkUnitResuming {
        table: String,
        window: String,
    },
    OrphanedUnitsReclaimed(usize), // count

    // === EXTRACT MESSAGES ===
    ExtractStarted {
        table: String,
        window: String,
    },
    ExtractBatchFetched {
        table: String,
        rows: usize,
    },
    ExtractRetrying {
        table: String,
        attempt: u32,
        delay_ms: u64,
    },
    ExtractResumedFromCheckpoint {
        table: String,
        offset: String,
    },
    SourceUnavailable(String),

    // === LOAD MESSAGES ===
    LoadDeletingExisting {
        table: String,
        window: String,
    },
    LoadInserted {
        table: String,
        rows: u64,
    },
    LoadIndexesDropped(String),    // table
    LoadIndexesRebuilt(String),    // table
    LoadDuplicateKeyDetected {
        table: String,
        detail: String,
    },
    TargetUnavailable(String),

    // === REPLICATION DRIVER MESSAGES ===
    ReplicationUnitStarted {
        table: String,
        window: String,
    },
    ReplicationUnitSkippedExisting {
        table: String,
        window: String,
    },
    ReplicationUnitSucceeded {
        table: String,
        window: String,
        rows: u64,
        elapsed_ms: u128,
    },
    ReplicationUnitFailed {
        table: String,
        window: String,
        error: String,
    },

    // === MONTHLY STREAMER MESSAGES ===
    StreamerWindowsPlanned {
        table: String,
        count: usize,
    },
    StreamerWorkerStarted(usize),  // worker slot
    StreamerWorkerCountAboveRecommended {
        requested: usize,
        recommended: usize,
    },
    StreamerProgress {
        table: String,
        done: usize,
        total: usize,
    },
    StreamerCompleted {
        table: String,
        succeeded: usize,
        failed: usize,
    },

    // === DAILY ORCHESTRATOR MESSAGES ===
    OrchestratorPassStarted(String), // "T-0" or "T-1"
    OrchestratorPassCompleted {
        pass: String,
        succeeded: usize,
        failed: usize,
    },
    OrchestratorRunRecorded(String), // run id

    // === EXPORT MESSAGES ===
    ExportWritingParquet {
        table: String,
        path: String,
    },
    ExportManifestWritten(String), // path
    ExportCompleted {
        table: String,
        rows: u64,
    },

    // === CLI SUMMARY MESSAGES ===
    RunSummaryHeader(String), // run id
    TableResultLine {
        table: String,
        window: String,
        success: bool,
        rows: u64,
    },
    RunFailedTables(usize), // count
    RunCompletedCleanly,
    Cancelled,

    // === GENERAL MESSAGES ===
    OperationCompleted,
    OperationCancelled,
    InvalidInput(String),
}
