//! `run-replica-etl`: the daily T-0/T-1 orchestrator entry point, intended
//! to be invoked once per scheduled interval (cron, a Windows scheduled
//! task, or similar).

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Args;

use crate::catalog::SchemaCatalog;
use crate::config::Config;
use crate::libs::messages::Message;
use crate::libs::view::View;
use crate::load::LoadParams;
use crate::msg_info;
use crate::orchestrator::{self, OrchestratorOptions};
use crate::store::history::RunHistoryStore;
use crate::store::ProgressStore;

#[derive(Debug, Args)]
pub struct RunReplicaEtlArgs {
    /// Target business date. Defaults to yesterday.
    #[arg(long)]
    date: Option<NaiveDate>,

    #[arg(long)]
    skip_t1: bool,

    /// Table to include. Repeatable; defaults to every table in the catalog.
    #[arg(long = "table")]
    tables: Vec<String>,
}

pub async fn cmd(args: RunReplicaEtlArgs) -> Result<()> {
    let config = Config::from_env()?;
    let catalog = Arc::new(SchemaCatalog::load(&config.schema_dump_path)?);
    let mut source = config.source.connect_source().await?;
    let target = config.target.connect_target().await?;
    let progress = ProgressStore::new(target.clone());
    let history = RunHistoryStore::new(target.clone());

    let job_date = args.date.unwrap_or_else(|| Local::now().date_naive() - chrono::Duration::days(1));
    let tables = if args.tables.is_empty() { catalog.table_names().map(str::to_string).collect() } else { args.tables.clone() };

    let options = OrchestratorOptions {
        skip_t1: args.skip_t1,
        tables,
        params: LoadParams { chunk_size: config.chunk_size, commit_interval: config.commit_interval },
    };

    let report = orchestrator::run(&mut source, &target, &progress, &history, &catalog, job_date, options).await?;

    View::run_report(&report);
    for (table, error) in &report.failed {
        tracing::error!(table, error, "table failed during daily run");
    }

    if !report.all_succeeded() {
        msg_info!(Message::RunFailedTables(report.failed.len()));
        anyhow::bail!("{} table(s) failed during run {}", report.failed.len(), report.run_id);
    }
    msg_info!(Message::RunCompletedCleanly);
    Ok(())
}
