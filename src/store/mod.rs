//! Progress & Audit Store: the two target metadata tables. All writes to
//! `etl_replica_progress` and `replica_run_history` go through
//! [`progress::ProgressStore`] / [`history::RunHistoryStore`]; no other
//! module issues raw SQL against either table.

pub mod history;
pub mod progress;

pub use progress::{ProgressHandle, ProgressStatus, ProgressStore, WindowSpec};
