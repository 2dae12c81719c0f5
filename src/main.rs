//! Entry point: initializes tracing, loads `.env`, and dispatches to the
//! CLI command handlers.

use anyhow::Result;
use replica_etl::commands::Cli;
use std::env;

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();

    if env::var("ETL_DEBUG").is_ok() || env::var("RUST_LOG").is_ok() {
        tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| "replica_etl=info".into()))
            .init();
    }

    Cli::menu().await
}
