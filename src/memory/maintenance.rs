use anyhow::Result;
use rusqlite::{params, Connection};
use serde::Serialize;

use super::forget::delete_in_tx;
use super::store::write_audit_log;
use super::truncate;
use crate::config::MemoryConfig;

// ── Result types ─────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct DecayResult {
    pub affected: usize,
    pub factor: f64,
}

#[derive(Debug, Serialize)]
pub struct CleanupResult {
    pub candidates: Vec<CleanupCandidate>,
    pub deleted: usize,
    pub dry_run: bool,
}

#[derive(Debug, Serialize)]
pub struct CleanupCandidate {
    pub id: String,
    #[serde(rename = "type")]
    pub memory_type: String,
    pub importance: f64,
    pub content_preview: String,
    pub last_accessed_at: String,
    pub created_at: String,
}

// ── Importance Decay ─────────────────────────────────────────────────────────

/// Multiply the importance of every unpinned memory by `config.decay_factor`.
pub fn apply_decay(conn: &Connection, config: &MemoryConfig) -> Result<DecayResult> {
    let factor = config.decay_factor.clamp(0.0, 1.0);

    let affected = conn.execute(
        "UPDATE memories SET importance = importance * ?1 \
         WHERE is_pinned = 0 AND importance > 0.0",
        params![factor],
    )?;

    if affected > 0 {
        // Synthetic memory_id for batch audit entries
        write_audit_log(
            conn,
            "decay",
            "batch:unpinned",
            Some(&serde_json::json!({
                "factor": factor,
                "affected": affected,
            })),
        )?;
    }

    tracing::info!(affected, factor, "importance decay applied");
    Ok(DecayResult { affected, factor })
}

// ── Stale Cleanup ────────────────────────────────────────────────────────────

/// Delete unpinned memories whose importance fell below the floor and that have not
/// been retrieved for `cleanup_no_access_days`. With `dry_run`, only report them.
pub fn cleanup_stale(
    conn: &mut Connection,
    config: &MemoryConfig,
    dry_run: bool,
) -> Result<CleanupResult> {
    let threshold =
        chrono::Utc::now() - chrono::Duration::days(config.cleanup_no_access_days as i64);
    let threshold_str = threshold.to_rfc3339();

    let candidates: Vec<CleanupCandidate> = {
        let mut stmt = conn.prepare(
            "SELECT id, memory_type, importance, content, last_accessed_at, created_at \
             FROM memories \
             WHERE is_pinned = 0 \
               AND importance < ?1 \
               AND last_accessed_at < ?2",
        )?;
        let collected = stmt
            .query_map(params![config.cleanup_importance_floor, threshold_str], |row| {
                let content: String = row.get(3)?;
                Ok(CleanupCandidate {
                    id: row.get(0)?,
                    memory_type: row.get(1)?,
                    importance: row.get(2)?,
                    content_preview: truncate(&content, 80),
                    last_accessed_at: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        collected
    };

    if dry_run {
        return Ok(CleanupResult {
            deleted: 0,
            dry_run: true,
            candidates,
        });
    }

    let tx = conn.transaction()?;
    for candidate in &candidates {
        delete_in_tx(&tx, &candidate.id)?;
        write_audit_log(
            &tx,
            "delete",
            &candidate.id,
            Some(&serde_json::json!({"reason": "cleanup"})),
        )?;
    }
    tx.commit()?;

    tracing::info!(deleted = candidates.len(), "stale memories cleaned up");
    Ok(CleanupResult {
        deleted: candidates.len(),
        dry_run: false,
        candidates,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use crate::memory::store::{add_memory, toggle_pin};
    use crate::memory::types::{MemoryType, NewMemory};

    #[test]
    fn decay_skips_pinned() {
        let mut conn = db::open_memory_database().unwrap();
        let config = MemoryConfig {
            decay_factor: 0.5,
            ..MemoryConfig::default()
        };
        let plain = add_memory(&mut conn, NewMemory::new("plain", MemoryType::Personal).importance(0.8)).unwrap();
        let pinned = add_memory(&mut conn, NewMemory::new("pinned", MemoryType::Personal).importance(0.8)).unwrap();
        toggle_pin(&conn, &pinned.id).unwrap();

        let result = apply_decay(&conn, &config).unwrap();
        assert_eq!(result.affected, 1);

        let importance = |id: &str| -> f64 {
            conn.query_row("SELECT importance FROM memories WHERE id = ?1", [id], |row| row.get(0))
                .unwrap()
        };
        assert!((importance(&plain.id) - 0.4).abs() < 1e-9);
        assert!((importance(&pinned.id) - 0.8).abs() < 1e-9);
    }

    #[test]
    fn fresh_memories_are_not_cleanup_candidates() {
        let mut conn = db::open_memory_database().unwrap();
        add_memory(&mut conn, NewMemory::new("tiny", MemoryType::Personal).importance(0.01)).unwrap();

        let result = cleanup_stale(&mut conn, &MemoryConfig::default(), true).unwrap();
        assert!(result.candidates.is_empty());
    }
}
