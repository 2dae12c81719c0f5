//! `replicate-reference`: ad hoc single- or multi-table replication, either
//! full-table or date-windowed, with an optional Parquet export instead of
//! the default streaming load.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::{Args, ValueEnum};

use crate::catalog::SchemaCatalog;
use crate::config::Config;
use crate::export;
use crate::extract;
use crate::libs::messages::Message;
use crate::load::LoadParams;
use crate::msg_info;
use crate::replicate::{self, UnitOptions};
use crate::store::{ProgressStore, WindowSpec};

#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum FullTableMode {
    Stream,
    Parquet,
}

#[derive(Debug, Args)]
pub struct ReplicateReferenceArgs {
    /// Replicate the entire table instead of a date window.
    #[arg(long)]
    full_table: bool,

    /// How a full-table replication is delivered.
    #[arg(long, value_enum, default_value = "stream")]
    full_table_mode: FullTableMode,

    /// Table to replicate. Repeatable; defaults to every table in the catalog.
    #[arg(long = "table")]
    tables: Vec<String>,

    #[arg(long)]
    start_date: Option<NaiveDate>,

    #[arg(long)]
    end_date: Option<NaiveDate>,

    /// Skip a work unit if a COMPLETED progress row already exists for it.
    #[arg(long)]
    skip_existing: bool,

    /// Extract only; do not write to the target (paired with parquet export).
    #[arg(long)]
    skip_load: bool,

    #[arg(long, default_value = "./export")]
    output_dir: PathBuf,
}

pub async fn cmd(args: ReplicateReferenceArgs) -> Result<()> {
    let config = Config::from_env()?;
    let catalog = Arc::new(SchemaCatalog::load(&config.schema_dump_path)?);
    let mut source = config.source.connect_source().await?;
    let target = config.target.connect_target().await?;
    let progress = ProgressStore::new(target.clone());

    let tables: Vec<String> = if args.tables.is_empty() { catalog.table_names().map(str::to_string).collect() } else { args.tables.clone() };

    let window = match (args.full_table, args.start_date, args.end_date) {
        (true, _, _) => WindowSpec::FullTable,
        (false, Some(start), Some(end)) => WindowSpec::DateRange { start, end },
        (false, _, _) => WindowSpec::FullTable,
    };

    let job_date = Local::now().date_naive();
    let params = LoadParams { chunk_size: config.chunk_size, commit_interval: config.commit_interval };
    let mut any_failed = false;

    for table in &tables {
        let result = if args.skip_load {
            extract_only(&mut source, &catalog, table, &window, &args, params).await
        } else {
            replicate::replicate_unit(&mut source, &target, &progress, &catalog, table, job_date, window.clone(), params, UnitOptions { skip_existing: args.skip_existing })
                .await
                .map(|r| r.rows_loaded)
                .map_err(anyhow::Error::from)
        };

        match result {
            Ok(rows) => msg_info!(Message::TableResultLine { table: table.clone(), window: window.tag(), success: true, rows }),
            Err(_) => {
                any_failed = true;
                msg_info!(Message::TableResultLine { table: table.clone(), window: window.tag(), success: false, rows: 0 });
            }
        }
    }

    if any_failed {
        anyhow::bail!("one or more tables failed to replicate");
    }
    Ok(())
}

async fn extract_only(
    source: &mut tiberius::Client<tokio_util::compat::Compat<tokio::net::TcpStream>>,
    catalog: &Arc<SchemaCatalog>,
    table: &str,
    window: &WindowSpec,
    args: &ReplicateReferenceArgs,
    params: LoadParams,
) -> anyhow::Result<u64> {
    let resumability = catalog.resumability(table)?;
    let query = extract::build_query(catalog, table, window, resumability, None)?;
    let cursor = extract::open_cursor(source, &query).await?;
    let batches_stream = extract::batches(cursor, params.chunk_size);
    futures::pin_mut!(batches_stream);
    let mut materialized = Vec::new();
    let mut rows = 0u64;
    while let Some(batch) = futures::StreamExt::next(&mut batches_stream).await {
        let batch = batch?;
        rows += batch.len() as u64;
        materialized.push(batch);
    }

    if matches!(args.full_table_mode, FullTableMode::Parquet) {
        let columns = catalog.columns(table)?;
        export::write_table_parquet(&args.output_dir, table, window, columns, &materialized)?;
    }
    Ok(rows)
}
