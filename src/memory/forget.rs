//! Memory deletion: single hard delete and bulk clear.
//!
//! Every delete removes the row from the memories table and the FTS5 index in the
//! same transaction and leaves an audit entry behind.

use anyhow::Result;
use rusqlite::{params, Connection, Transaction};
use serde::Serialize;

use super::store::write_audit_log;

/// Result returned from [`clear_all`].
#[derive(Debug, Serialize)]
pub struct ClearResult {
    pub deleted: usize,
    pub pinned_kept: usize,
}

/// Permanently delete a memory by ID.
pub fn delete_memory(conn: &mut Connection, memory_id: &str, reason: Option<&str>) -> Result<()> {
    let tx = conn.transaction()?;
    delete_in_tx(&tx, memory_id)?;
    write_audit_log(
        &tx,
        "delete",
        memory_id,
        Some(&serde_json::json!({ "reason": reason })),
    )?;
    tx.commit()?;
    Ok(())
}

/// Delete every memory. Pinned memories survive unless `include_pinned` is set.
pub fn clear_all(conn: &mut Connection, include_pinned: bool) -> Result<ClearResult> {
    let tx = conn.transaction()?;

    let ids: Vec<String> = {
        let sql = if include_pinned {
            "SELECT id FROM memories"
        } else {
            "SELECT id FROM memories WHERE is_pinned = 0"
        };
        let mut stmt = tx.prepare(sql)?;
        let collected = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        collected
    };

    for id in &ids {
        delete_in_tx(&tx, id)?;
    }

    let pinned_kept: i64 = tx.query_row("SELECT COUNT(*) FROM memories", [], |row| row.get(0))?;

    write_audit_log(
        &tx,
        "clear",
        "batch:all",
        Some(&serde_json::json!({
            "deleted": ids.len(),
            "include_pinned": include_pinned,
        })),
    )?;

    tx.commit()?;

    tracing::info!(deleted = ids.len(), pinned_kept, "memories cleared");
    Ok(ClearResult {
        deleted: ids.len(),
        pinned_kept: pinned_kept as usize,
    })
}

/// Remove one memory from the FTS5 index and the memories table.
pub(crate) fn delete_in_tx(tx: &Transaction<'_>, memory_id: &str) -> Result<()> {
    let (rowid, content, tags): (i64, String, String) = tx
        .query_row(
            "SELECT rowid, content, tags FROM memories WHERE id = ?1",
            params![memory_id],
            |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
        )
        .map_err(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => {
                anyhow::anyhow!("memory not found: {memory_id}")
            }
            other => anyhow::anyhow!("database error: {other}"),
        })?;

    // External content table requires the special delete command with the indexed values
    tx.execute(
        "INSERT INTO memories_fts(memories_fts, rowid, content, tags, id) VALUES('delete', ?1, ?2, ?3, ?4)",
        params![rowid, content, tags, memory_id],
    )?;

    tx.execute("DELETE FROM memories WHERE id = ?1", params![memory_id])?;
    Ok(())
}
