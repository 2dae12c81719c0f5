//! # replica-etl
//!
//! A resumable, idempotent, date-sliced bulk replication engine that mirrors
//! an operational POS database into an owned analytical warehouse, reached
//! only over a metered VPN link.
//!
//! ## Components
//!
//! - **Config**: environment-driven connection descriptors for source and
//!   target endpoints.
//! - **Catalog**: the process-wide immutable schema dump (column order,
//!   date-filter columns, replica table naming).
//! - **Migrate**: applies ordered SQL migrations and generates replica DDL.
//! - **Store**: the progress and run-history metadata tables.
//! - **Extract** / **Load**: the streaming cursor and the delete-before-insert
//!   bulk writer.
//! - **Replicate**: glues Extract and Load for one (table, window) work unit.
//! - **Streamer**: shards a wide date range across a bounded worker pool.
//! - **Orchestrator**: the daily T-0/T-1 scheduler.
//! - **Export**: optional Parquet output mode.

pub mod catalog;
pub mod commands;
pub mod config;
pub mod export;
pub mod extract;
pub mod libs;
pub mod load;
pub mod migrate;
pub mod orchestrator;
pub mod replicate;
pub mod store;
pub mod streamer;
