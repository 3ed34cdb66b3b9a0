//! CLI `memory show` command: display full details for a single memory.

use anyhow::{Context, Result};

use gemi::config::GemiConfig;
use gemi::memory::search;

/// Show one memory by ID together with its audit trail.
pub fn show(config: &GemiConfig, id: &str) -> Result<()> {
    let conn = super::open_db(config)?;

    let m = search::get_memory(&conn, id)?.with_context(|| format!("memory not found: {id}"))?;
    let log = search::memory_log(&conn, id)?;

    println!("Memory: {}", m.id);
    println!("{}", "=".repeat(50));
    println!("  Type:           {}", m.memory_type);
    println!("  Importance:     {:.2}", m.importance);
    println!("  Pinned:         {}", if m.is_pinned { "yes" } else { "no" });
    println!("  Access count:   {}", m.access_count);
    println!("  Last accessed:  {}", m.last_accessed_at);
    println!("  Created:        {}", m.created_at);
    if !m.tags.is_empty() {
        println!("  Tags:           {}", m.tags.join(", "));
    }
    if let Some(ref entry) = m.source_entry_id {
        println!("  Journal entry:  {entry}");
    }
    println!();
    println!("Content:");
    for line in m.content.lines() {
        println!("  {line}");
    }

    if !log.is_empty() {
        println!();
        println!("Audit Log:");
        for entry in log {
            let details = entry
                .details
                .as_ref()
                .map(|d| d.to_string())
                .unwrap_or_default();
            println!("  {} [{}] {}", entry.created_at, entry.operation, details);
        }
    }

    Ok(())
}
