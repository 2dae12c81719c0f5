//! Command-line interface for the replication engine.
//!
//! Three driver commands cover the system's external surface: ad hoc
//! reference-table replication, monthly parallel backfill, and the daily
//! T-0/T-1 orchestrator run. A fourth, debug-build-only command exposes
//! migration status for operators.

pub mod migrations;
pub mod replicate_monthly_parallel;
pub mod replicate_reference;
pub mod run_replica_etl;

use anyhow::Result;
use clap::{Parser, Subcommand};

#[derive(Debug, Subcommand)]
enum Commands {
    /// Replicate one or more reference/date-windowed tables on demand
    #[command(about = "Replicate reference or date-windowed tables")]
    ReplicateReference(replicate_reference::ReplicateReferenceArgs),

    /// Shard a wide date range across a bounded worker pool
    #[command(about = "Replicate a date-partitioned table in month-sized parallel chunks")]
    ReplicateMonthlyParallel(replicate_monthly_parallel::ReplicateMonthlyParallelArgs),

    /// Run the daily T-0/T-1 orchestrator pass
    #[command(about = "Run the daily T-0/T-1 replication pass")]
    RunReplicaEtl(run_replica_etl::RunReplicaEtlArgs),

    /// Database migration status and application (debug builds only)
    #[cfg(debug_assertions)]
    #[command(about = "Database migration management")]
    Migrations(migrations::MigrationsArgs),
}

#[derive(Debug, Parser)]
#[command(author, version, about, long_about = None)]
#[command(arg_required_else_help(true))]
pub struct Cli {
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub async fn menu() -> Result<()> {
        let cli = Self::parse();

        match cli.command {
            Commands::ReplicateReference(args) => replicate_reference::cmd(args).await,
            Commands::ReplicateMonthlyParallel(args) => replicate_monthly_parallel::cmd(args).await,
            Commands::RunReplicaEtl(args) => run_replica_etl::cmd(args).await,

            #[cfg(debug_assertions)]
            Commands::Migrations(args) => migrations::cmd(args).await,
        }
    }
}
