use anyhow::Result;
use rusqlite::Connection;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

use crate::memory::types::MemoryType;

/// Aggregate counts over the memory store.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MemoryStats {
    pub total_memories: u64,
    pub pinned_memories: u64,
    pub by_type: BTreeMap<String, u64>,
    pub average_importance: f64,
    pub total_accesses: u64,
    pub log_entries: u64,
    pub db_size_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub oldest_memory: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub newest_memory: Option<String>,
}

/// Compute memory store statistics.
///
/// `db_path` is used for file size calculation; pass None for in-memory databases.
pub fn memory_stats(conn: &Connection, db_path: Option<&Path>) -> Result<MemoryStats> {
    let (total, pinned, average_importance, total_accesses): (i64, i64, f64, i64) = conn.query_row(
        "SELECT COUNT(*), COALESCE(SUM(is_pinned), 0), COALESCE(AVG(importance), 0.0), \
         COALESCE(SUM(access_count), 0) FROM memories",
        [],
        |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?)),
    )?;

    let by_type = count_by_type(conn)?;
    let (oldest, newest) = memory_time_range(conn)?;
    let log_entries: i64 = conn.query_row("SELECT COUNT(*) FROM memory_log", [], |row| row.get(0))?;

    let db_size_bytes = db_path
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);

    Ok(MemoryStats {
        total_memories: total as u64,
        pinned_memories: pinned as u64,
        by_type,
        average_importance,
        total_accesses: total_accesses as u64,
        log_entries: log_entries as u64,
        db_size_bytes,
        oldest_memory: oldest,
        newest_memory: newest,
    })
}

/// Count by memory type. Every type is present, zero when unused.
fn count_by_type(conn: &Connection) -> Result<BTreeMap<String, u64>> {
    let mut map: BTreeMap<String, u64> = MemoryType::ALL
        .iter()
        .map(|t| (t.as_str().to_string(), 0))
        .collect();

    let mut stmt = conn.prepare("SELECT memory_type, COUNT(*) FROM memories GROUP BY memory_type")?;
    let rows: Vec<(String, i64)> = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<Result<Vec<_>, _>>()?;

    for (t, count) in rows {
        map.insert(t, count as u64);
    }
    Ok(map)
}

fn memory_time_range(conn: &Connection) -> Result<(Option<String>, Option<String>)> {
    let range = conn.query_row(
        "SELECT MIN(created_at), MAX(created_at) FROM memories",
        [],
        |row| Ok((row.get(0)?, row.get(1)?)),
    )?;
    Ok(range)
}
