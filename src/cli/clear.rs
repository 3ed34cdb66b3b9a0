//! CLI `memory clear` command: delete every memory after user confirmation.

use anyhow::{bail, Result};
use std::io::Write;

use gemi::config::GemiConfig;
use gemi::memory::forget;

/// Delete all memories. Pinned ones survive unless `include_pinned` is set.
pub fn clear(config: &GemiConfig, include_pinned: bool, yes: bool) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !yes {
        if include_pinned {
            println!("WARNING: This will permanently delete ALL memories, pinned ones included.");
        } else {
            println!("WARNING: This will permanently delete all unpinned memories.");
        }
        println!("Database: {}", db_path.display());
        print!("\nType YES to confirm: ");
        std::io::stdout().flush()?;

        let mut input = String::new();
        std::io::stdin().read_line(&mut input)?;

        if input.trim() != "YES" {
            bail!("clear cancelled");
        }
    }

    let mut conn = super::open_db(config)?;
    let result = forget::clear_all(&mut conn, include_pinned)?;

    println!("Deleted {} memories.", result.deleted);
    if result.pinned_kept > 0 {
        println!("Kept {} pinned memories (use --include-pinned to remove them).", result.pinned_kept);
    }
    Ok(())
}
