pub mod chat;
pub mod clear;
pub mod doctor;
pub mod maintenance;
pub mod memory;
pub mod search;
pub mod show;
pub mod stats;

use anyhow::{Context, Result};
use rusqlite::Connection;

use gemi::config::GemiConfig;

/// Open the configured database for a one-shot management command.
pub(crate) fn open_db(config: &GemiConfig) -> Result<Connection> {
    let db_path = config.resolved_db_path();
    gemi::db::open_database(&db_path)
        .with_context(|| format!("failed to open database at {}", db_path.display()))
}

/// Single-line preview of memory content for tabular output.
pub(crate) fn preview(content: &str, max: usize) -> String {
    let flat = content.replace('\n', " ");
    gemi::memory::truncate(&flat, max)
}

pub(crate) fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
