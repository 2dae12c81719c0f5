//! `replicate-monthly-parallel <table>`: shards a wide date range for one
//! date-partitioned table across a bounded worker pool.

use std::sync::Arc;

use anyhow::Result;
use chrono::{Local, NaiveDate};
use clap::Args;

use crate::catalog::SchemaCatalog;
use crate::config::Config;
use crate::libs::messages::Message;
use crate::load::LoadParams;
use crate::msg_info;
use crate::store::ProgressStore;
use crate::streamer::{self, StreamerOptions};

#[derive(Debug, Args)]
pub struct ReplicateMonthlyParallelArgs {
    table: String,

    #[arg(long)]
    start_date: NaiveDate,

    #[arg(long)]
    end_date: NaiveDate,

    #[arg(long, default_value_t = streamer::RECOMMENDED_MAX_WORKERS)]
    max_workers: usize,

    #[arg(long)]
    resume: bool,

    #[arg(long)]
    chunk_size: Option<usize>,

    #[arg(long)]
    commit_interval: Option<usize>,
}

pub async fn cmd(args: ReplicateMonthlyParallelArgs) -> Result<()> {
    let config = Config::from_env()?;
    let catalog = Arc::new(SchemaCatalog::load(&config.schema_dump_path)?);
    let target = config.target.connect_target().await?;
    let progress = ProgressStore::new(target.clone());

    let params = LoadParams {
        chunk_size: args.chunk_size.unwrap_or(config.chunk_size),
        commit_interval: args.commit_interval.unwrap_or(config.commit_interval),
    };
    let options = StreamerOptions { max_workers: args.max_workers, resume: args.resume, params };

    let source_descriptor = config.source.clone();
    let connect_source = std::sync::Arc::new(move || {
        let descriptor = source_descriptor.clone();
        Box::pin(async move { descriptor.connect_source().await }) as std::pin::Pin<Box<dyn std::future::Future<Output = _> + Send>>
    });

    let results = streamer::run(
        target,
        progress,
        catalog,
        args.table.clone(),
        args.start_date,
        args.end_date,
        Local::now().date_naive(),
        options,
        connect_source,
    )
    .await?;

    let failed = results.iter().filter(|r| !r.succeeded).count();
    for result in &results {
        msg_info!(Message::TableResultLine { table: result.table.clone(), window: result.window.tag(), success: result.succeeded, rows: result.rows_loaded });
    }
    if failed > 0 {
        anyhow::bail!("{} window(s) failed", failed);
    }
    Ok(())
}
