#[cfg(debug_assertions)]
use crate::{config::Config, libs::messages::Message, migrate, msg_info};
#[cfg(debug_assertions)]
use anyhow::Result;
#[cfg(debug_assertions)]
use clap::{Args, Subcommand};

#[cfg(debug_assertions)]
#[derive(Debug, Args)]
pub struct MigrationsArgs {
    #[command(subcommand)]
    command: MigrationsCommand,
}

#[cfg(debug_assertions)]
#[derive(Debug, Subcommand)]
enum MigrationsCommand {
    /// Show the count of pending migrations
    Status,
    /// Apply every pending migration
    Apply,
}

#[cfg(debug_assertions)]
pub async fn cmd(args: MigrationsArgs) -> Result<()> {
    let config = Config::from_env()?;
    let pool = config.target.connect_target().await?;

    match args.command {
        MigrationsCommand::Status => {
            let pending = migrate::pending_count(&pool).await?;
            if pending == 0 {
                msg_info!(Message::DatabaseUpToDate);
            } else {
                msg_info!(Message::MigrationsFound(pending));
                msg_info!(Message::DatabaseNeedsUpdate);
            }
        }
        MigrationsCommand::Apply => {
            migrate::apply(&pool).await?;
            msg_info!(Message::AllMigrationsCompleted);
        }
    }

    Ok(())
}
