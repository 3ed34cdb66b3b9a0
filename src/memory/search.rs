use anyhow::Result;
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde::Serialize;

use crate::memory::types::{Memory, MemoryType};

// ── Public types ──────────────────────────────────────────────────────────────

/// An audit log entry for a single memory.
#[derive(Debug, Serialize)]
pub struct LogEntry {
    pub operation: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub created_at: String,
}

/// Pinned memories rank this much higher than unpinned ones at equal relevance.
const PINNED_BOOST: f64 = 1.25;

/// Words too common to say anything about relevance.
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "are", "but", "not", "you", "all", "any", "can", "had", "her", "was",
    "one", "our", "out", "has", "him", "his", "how", "its", "may", "new", "now", "see", "who",
    "did", "get", "got", "let", "say", "she", "too", "use", "that", "with", "have", "this",
    "will", "your", "from", "they", "been", "were", "what", "when", "them", "than", "then",
    "into", "just", "like", "some", "very", "also", "about", "there", "their", "would",
    "could", "should", "which", "today",
];

const MEMORY_COLUMNS: &str = "id, content, source_entry_id, memory_type, importance, tags, \
     is_pinned, access_count, created_at, last_accessed_at";

// ── Public API ────────────────────────────────────────────────────────────────

/// Keyword search over memory content and tags.
///
/// FTS5 BM25 relevance weighted by importance, pinned boost, newest first on ties.
/// Returns at most `limit` memories and records the access on each of them.
pub fn search_memories(conn: &Connection, query: &str, limit: usize) -> Result<Vec<Memory>> {
    if limit == 0 {
        return Ok(Vec::new());
    }

    let fts_query = build_fts_query(query);
    if fts_query.is_empty() {
        return Ok(Vec::new());
    }

    // 1. Candidate set from FTS5, a few more than needed so re-weighting has room
    let candidate_limit = i64::try_from(limit.saturating_mul(4).max(20)).unwrap_or(i64::MAX);
    let mut stmt = conn.prepare(&format!(
        "SELECT {cols}, memories_fts.rank \
         FROM memories_fts JOIN memories ON memories.rowid = memories_fts.rowid \
         WHERE memories_fts MATCH ?1 ORDER BY memories_fts.rank LIMIT ?2",
        cols = qualified_columns(),
    ))?;
    let candidates: Vec<(Memory, f64)> = stmt
        .query_map(params![fts_query, candidate_limit], |row| {
            Ok((memory_from_row(row)?, row.get::<_, f64>(10)?))
        })?
        .collect::<Result<Vec<_>, _>>()?;

    // 2. Re-weight: FTS5 rank is negative (more negative = better)
    let mut scored: Vec<(Memory, f64)> = candidates
        .into_iter()
        .map(|(memory, rank)| {
            let score = relevance_score(-rank, memory.importance, memory.is_pinned);
            (memory, score)
        })
        .collect();
    scored.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| b.0.created_at.cmp(&a.0.created_at))
    });
    scored.truncate(limit);

    // 3. Access tracking
    let now = chrono::Utc::now().to_rfc3339();
    let ids: Vec<&str> = scored.iter().map(|(m, _)| m.id.as_str()).collect();
    update_access(conn, &ids, &now)?;

    let results = scored
        .into_iter()
        .map(|(mut memory, _)| {
            memory.access_count += 1;
            memory.last_accessed_at = now.clone();
            memory
        })
        .collect::<Vec<_>>();

    tracing::debug!(query = %query, results = results.len(), "memory search");
    Ok(results)
}

/// All memories, pinned first, then newest first. Does not count as access.
pub fn get_all_memories(conn: &Connection, limit: usize) -> Result<Vec<Memory>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {MEMORY_COLUMNS} FROM memories \
         ORDER BY is_pinned DESC, created_at DESC, id DESC LIMIT ?1"
    ))?;
    let rows = stmt
        .query_map(params![limit as i64], memory_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Fetch a single memory by ID.
pub fn get_memory(conn: &Connection, memory_id: &str) -> Result<Option<Memory>> {
    let memory = conn
        .query_row(
            &format!("SELECT {MEMORY_COLUMNS} FROM memories WHERE id = ?1"),
            params![memory_id],
            memory_from_row,
        )
        .optional()?;
    Ok(memory)
}

/// Audit log entries for one memory, oldest first.
pub fn memory_log(conn: &Connection, memory_id: &str) -> Result<Vec<LogEntry>> {
    let mut stmt = conn.prepare(
        "SELECT operation, details, created_at \
         FROM memory_log WHERE memory_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![memory_id], |row| {
            let details_str: Option<String> = row.get(1)?;
            Ok(LogEntry {
                operation: row.get(0)?,
                details: details_str.and_then(|s| serde_json::from_str(&s).ok()),
                created_at: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

// ── Internal helpers ──────────────────────────────────────────────────────────

fn qualified_columns() -> String {
    MEMORY_COLUMNS
        .split(", ")
        .map(|c| format!("memories.{}", c.trim()))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Map a row selected with [`MEMORY_COLUMNS`] (in order) to a [`Memory`].
pub(crate) fn memory_from_row(row: &Row<'_>) -> rusqlite::Result<Memory> {
    let memory_type: String = row.get(3)?;
    let tags_json: String = row.get(5)?;
    Ok(Memory {
        id: row.get(0)?,
        content: row.get(1)?,
        source_entry_id: row.get(2)?,
        memory_type: memory_type.parse::<MemoryType>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                3,
                rusqlite::types::Type::Text,
                e.into(),
            )
        })?,
        importance: row.get(4)?,
        tags: serde_json::from_str(&tags_json).unwrap_or_default(),
        is_pinned: row.get(6)?,
        access_count: row.get(7)?,
        created_at: row.get(8)?,
        last_accessed_at: row.get(9)?,
    })
}

fn relevance_score(relevance: f64, importance: f64, pinned: bool) -> f64 {
    let weighted = relevance * (0.5 + importance);
    if pinned {
        weighted * PINNED_BOOST
    } else {
        weighted
    }
}

/// Turn free text into an FTS5 OR-query of quoted terms.
///
/// Splits on anything that is not alphanumeric, lower-cases, drops short words and
/// stop words, and removes duplicates. Empty when nothing usable remains.
fn build_fts_query(query: &str) -> String {
    let mut terms: Vec<String> = Vec::new();
    for word in query.split(|c: char| !c.is_alphanumeric()) {
        let word = word.to_lowercase();
        if word.chars().count() < 3 || STOP_WORDS.contains(&word.as_str()) {
            continue;
        }
        if !terms.contains(&word) {
            terms.push(word);
        }
    }
    terms
        .iter()
        .map(|t| format!("\"{t}\""))
        .collect::<Vec<_>>()
        .join(" OR ")
}

/// Batch update access_count and last_accessed_at for returned results.
fn update_access(conn: &Connection, ids: &[&str], now: &str) -> Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    let mut stmt = conn.prepare(
        "UPDATE memories SET access_count = access_count + 1, last_accessed_at = ?1 WHERE id = ?2",
    )?;
    for id in ids {
        stmt.execute(params![now, id])?;
    }
    Ok(())
}
