//! Environment-driven configuration for the replication engine's two
//! database endpoints.
//!
//! This is a headless batch job, not an interactive CLI: there is no
//! `dialoguer` setup wizard and nothing is persisted back to disk. Values
//! come from the process environment, optionally populated from a `.env`
//! file via `dotenvy`, and are read once at startup into an immutable
//! [`EtlConfig`] that every component receives through its constructor.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::PgPool;
use tiberius::{AuthMethod, Client, Config as TiberiusConfig};
use tokio::net::TcpStream;
use tokio_util::compat::{Compat, TokioAsyncWriteCompatExt};

use crate::libs::error::EtlError;

/// Connection parameters for one database endpoint (source or target).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConnectionDescriptor {
    pub driver: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

impl ConnectionDescriptor {
    fn from_env(prefix: &str) -> Result<Self, EtlError> {
        Ok(Self {
            driver: env_var(prefix, "DRIVER")?,
            host: env_var(prefix, "HOST")?,
            port: env_var(prefix, "PORT")?
                .parse()
                .map_err(|_| EtlError::Configuration(format!("{}_PORT must be a valid port number", prefix)))?,
            database: env_var(prefix, "DATABASE")?,
            username: env_var(prefix, "USERNAME")?,
            password: env_var(prefix, "PASSWORD")?,
        })
    }

    /// Opens a streaming `tiberius` connection to this endpoint as the
    /// extractor's source (SQL Server, reached over the metered VPN link).
    pub async fn connect_source(&self) -> Result<Client<Compat<TcpStream>>, EtlError> {
        let mut config = TiberiusConfig::new();
        config.host(&self.host);
        config.port(self.port);
        config.database(&self.database);
        config.authentication(AuthMethod::sql_server(&self.username, &self.password));
        config.trust_cert();

        let tcp = TcpStream::connect(config.get_addr())
            .await
            .map_err(|e| EtlError::SourceUnavailable(e.into()))?;
        tcp.set_nodelay(true).map_err(|e| EtlError::SourceUnavailable(e.into()))?;

        Client::connect(config, tcp.compat_write())
            .await
            .map_err(|e| EtlError::SourceUnavailable(e.into()))
    }

    /// Opens a pooled `sqlx` connection to this endpoint as the loader's
    /// target (the owned analytical warehouse).
    pub async fn connect_target(&self) -> Result<PgPool, EtlError> {
        let options = PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.username)
            .password(&self.password);

        PgPoolOptions::new()
            .max_connections(10)
            .connect_with(options)
            .await
            .map_err(|e| EtlError::TargetUnavailable(e.into()))
    }
}

/// Fully resolved runtime configuration for a replication run.
#[derive(Debug, Clone)]
pub struct EtlConfig {
    pub source: ConnectionDescriptor,
    pub target: ConnectionDescriptor,
    pub schema_dump_path: PathBuf,
    pub export_dir: PathBuf,
    pub retention_days: u32,
    pub chunk_size: usize,
    pub commit_interval: usize,
    pub max_workers: usize,
}

/// Loads [`EtlConfig`] from the process environment.
pub struct Config;

impl Config {
    /// Populates the environment from a `.env` file in the working
    /// directory (if present) and reads the `SOURCE_*` / `TARGET_*` /
    /// `ETL_*` variables into an [`EtlConfig`].
    pub fn from_env() -> Result<EtlConfig, EtlError> {
        let _ = dotenvy::dotenv();

        Ok(EtlConfig {
            source: ConnectionDescriptor::from_env("SOURCE")?,
            target: ConnectionDescriptor::from_env("TARGET")?,
            schema_dump_path: optional_env("ETL_SCHEMA_DUMP")
                .unwrap_or_else(|| "./schema_dump.json".to_string())
                .into(),
            export_dir: optional_env("ETL_EXPORT_DIR")
                .unwrap_or_else(|| "./export".to_string())
                .into(),
            retention_days: optional_env("ETL_RETENTION_DAYS")
                .map(|v| parse_u32("ETL_RETENTION_DAYS", &v))
                .transpose()?
                .unwrap_or(90),
            chunk_size: optional_env("ETL_CHUNK_SIZE")
                .map(|v| parse_usize("ETL_CHUNK_SIZE", &v))
                .transpose()?
                .unwrap_or(10_000),
            commit_interval: optional_env("ETL_COMMIT_INTERVAL")
                .map(|v| parse_usize("ETL_COMMIT_INTERVAL", &v))
                .transpose()?
                .unwrap_or(100_000),
            max_workers: optional_env("ETL_MAX_WORKERS")
                .map(|v| parse_usize("ETL_MAX_WORKERS", &v))
                .transpose()?
                .unwrap_or(2),
        })
    }
}

fn env_var(prefix: &str, suffix: &str) -> Result<String, EtlError> {
    let name = format!("{}_{}", prefix, suffix);
    std::env::var(&name).map_err(|_| EtlError::Configuration(format!("missing required environment variable {}", name)))
}

fn optional_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

fn parse_u32(name: &str, value: &str) -> Result<u32, EtlError> {
    value
        .parse()
        .map_err(|_| EtlError::Configuration(format!("{} must be a non-negative integer", name)))
}

fn parse_usize(name: &str, value: &str) -> Result<usize, EtlError> {
    value
        .parse()
        .map_err(|_| EtlError::Configuration(format!("{} must be a non-negative integer", name)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn set_required_vars() {
        for (prefix, port) in [("SOURCE", "1433"), ("TARGET", "5432")] {
            std::env::set_var(format!("{}_DRIVER", prefix), "default");
            std::env::set_var(format!("{}_HOST", prefix), "localhost");
            std::env::set_var(format!("{}_PORT", prefix), port);
            std::env::set_var(format!("{}_DATABASE", prefix), "db");
            std::env::set_var(format!("{}_USERNAME", prefix), "user");
            std::env::set_var(format!("{}_PASSWORD", prefix), "pass");
        }
    }

    fn clear_all_vars() {
        for prefix in ["SOURCE", "TARGET"] {
            for suffix in ["DRIVER", "HOST", "PORT", "DATABASE", "USERNAME", "PASSWORD"] {
                std::env::remove_var(format!("{}_{}", prefix, suffix));
            }
        }
        for name in ["ETL_EXPORT_DIR", "ETL_RETENTION_DAYS", "ETL_CHUNK_SIZE", "ETL_COMMIT_INTERVAL", "ETL_MAX_WORKERS"] {
            std::env::remove_var(name);
        }
    }

    #[test]
    fn from_env_applies_defaults_when_optional_vars_absent() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all_vars();
        set_required_vars();

        let config = Config::from_env().expect("required vars are set");
        assert_eq!(config.chunk_size, 10_000);
        assert_eq!(config.commit_interval, 100_000);
        assert_eq!(config.max_workers, 2);
        assert_eq!(config.retention_days, 90);

        clear_all_vars();
    }

    #[test]
    fn from_env_fails_on_missing_required_var() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all_vars();

        let result = Config::from_env();
        assert!(matches!(result, Err(EtlError::Configuration(_))));

        clear_all_vars();
    }
}
