//! Centralized message management for the replica-etl CLI.
//!
//! All user-facing text - per-table success/fail lines, migration progress,
//! run summaries - goes through a [`Message`] variant and one of the prefix
//! helpers below, instead of an inline `println!`.

pub mod display;
pub mod macros;
pub mod types;

pub use types::Message;

pub fn success(msg: Message) -> String {
    format!("✅ {}", msg)
}

pub fn error(msg: Message) -> String {
    format!("❌ {}", msg)
}

pub fn warning(msg: Message) -> String {
    format!("⚠️  {}", msg)
}

pub fn info(msg: Message) -> String {
    format!("ℹ️  {}", msg)
}

pub fn wrap_msg(msg: Message) -> String {
    format!("\n{}\n", msg)
}
