//! Write path: insert, FTS sync, edits, and audit logging.
//!
//! [`add_memory`] runs inside a transaction: insert into the memories table, sync the
//! FTS5 index, write an audit log entry. [`add_memory_from_conversation`] wraps it for
//! the chat write-back.

use anyhow::{bail, ensure, Result};
use rusqlite::{params, Connection, OptionalExtension};

use crate::config::MemoryConfig;
use crate::memory::search::get_memory;
use crate::memory::truncate;
use crate::memory::types::{normalize_tags, Memory, MemoryType, NewMemory};

/// Full write path: validate → insert → FTS sync → audit log.
pub fn add_memory(conn: &mut Connection, new: NewMemory) -> Result<Memory> {
    ensure!(!new.content.trim().is_empty(), "content must not be empty");
    ensure!(
        (0.0..=1.0).contains(&new.importance),
        "importance must be between 0.0 and 1.0"
    );

    let tags = normalize_tags(&new.tags);
    let tags_json = serde_json::to_string(&tags)?;
    let id = uuid::Uuid::now_v7().to_string();
    let now = chrono::Utc::now().to_rfc3339();

    let tx = conn.transaction()?;

    tx.execute(
        "INSERT INTO memories (id, content, source_entry_id, memory_type, importance, tags, is_pinned, created_at, last_accessed_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)",
        params![
            id,
            new.content,
            new.source_entry_id,
            new.memory_type.as_str(),
            new.importance,
            tags_json,
            new.is_pinned,
            now,
        ],
    )?;
    let rowid = tx.last_insert_rowid();

    // Must use the same rowid and column values as the memories row
    tx.execute(
        "INSERT INTO memories_fts (rowid, content, tags, id) VALUES (?1, ?2, ?3, ?4)",
        params![rowid, new.content, tags_json, id],
    )?;

    write_audit_log(
        &tx,
        "create",
        &id,
        Some(&serde_json::json!({"type": new.memory_type.as_str()})),
    )?;

    tx.commit()?;

    tracing::debug!(id = %id, memory_type = %new.memory_type, "memory stored");

    Ok(Memory {
        id,
        content: new.content,
        source_entry_id: new.source_entry_id,
        memory_type: new.memory_type,
        importance: new.importance,
        tags,
        is_pinned: new.is_pinned,
        access_count: 0,
        created_at: now.clone(),
        last_accessed_at: now,
    })
}

/// Persist a completed chat exchange as a `conversation` memory.
pub fn add_memory_from_conversation(
    conn: &mut Connection,
    user_message: &str,
    ai_response: &str,
    config: &MemoryConfig,
) -> Result<Memory> {
    let content = conversation_content(user_message, ai_response, config.conversation_char_limit);
    add_memory(
        conn,
        NewMemory::new(content, MemoryType::Conversation)
            .importance(config.conversation_importance)
            .tags(["conversation"]),
    )
}

/// Render an exchange as memory text, each side cut to half of `char_limit`.
pub fn conversation_content(user_message: &str, ai_response: &str, char_limit: usize) -> String {
    let half = (char_limit / 2).max(1);
    format!(
        "User shared: {}\nGemi replied: {}",
        truncate(user_message.trim(), half),
        truncate(ai_response.trim(), half),
    )
}

/// Set a memory's importance. Values outside `[0, 1]` are rejected.
pub fn update_importance(conn: &Connection, memory_id: &str, importance: f64) -> Result<()> {
    ensure!(
        (0.0..=1.0).contains(&importance),
        "importance must be between 0.0 and 1.0"
    );
    let rows = conn.execute(
        "UPDATE memories SET importance = ?1 WHERE id = ?2",
        params![importance, memory_id],
    )?;
    if rows == 0 {
        bail!("memory not found: {memory_id}");
    }
    write_audit_log(
        conn,
        "update",
        memory_id,
        Some(&serde_json::json!({"importance": importance})),
    )?;
    Ok(())
}

/// Flip a memory's pin flag. Returns the new state.
pub fn toggle_pin(conn: &Connection, memory_id: &str) -> Result<bool> {
    let current: Option<bool> = conn
        .query_row(
            "SELECT is_pinned FROM memories WHERE id = ?1",
            params![memory_id],
            |row| row.get(0),
        )
        .optional()?;
    let Some(current) = current else {
        bail!("memory not found: {memory_id}");
    };

    let pinned = !current;
    conn.execute(
        "UPDATE memories SET is_pinned = ?1 WHERE id = ?2",
        params![pinned, memory_id],
    )?;
    write_audit_log(conn, "pin", memory_id, Some(&serde_json::json!({"pinned": pinned})))?;
    Ok(pinned)
}

/// Convenience for callers that want the full record after an edit.
pub fn reload(conn: &Connection, memory_id: &str) -> Result<Memory> {
    match get_memory(conn, memory_id)? {
        Some(memory) => Ok(memory),
        None => bail!("memory not found: {memory_id}"),
    }
}

/// Write an entry to the memory_log audit table.
pub(crate) fn write_audit_log(
    conn: &Connection,
    operation: &str,
    memory_id: &str,
    details: Option<&serde_json::Value>,
) -> Result<()> {
    let now = chrono::Utc::now().to_rfc3339();
    let details_json = details.map(|d| d.to_string());
    conn.execute(
        "INSERT INTO memory_log (operation, memory_id, details, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![operation, memory_id, details_json, now],
    )?;
    Ok(())
}
