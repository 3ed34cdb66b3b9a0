//! CLI `memory maintain` command: importance decay followed by stale cleanup.

use anyhow::Result;

use gemi::config::GemiConfig;
use gemi::memory::maintenance;

/// Decay unpinned memories, then remove the ones that faded out.
///
/// With `dry_run`, nothing is written and the cleanup candidates are listed instead.
pub fn maintain(config: &GemiConfig, dry_run: bool) -> Result<()> {
    let mut conn = super::open_db(config)?;

    if dry_run {
        println!("Skipping importance decay (dry run).");
    } else {
        println!("Applying importance decay...");
        let decay = maintenance::apply_decay(&conn, &config.memory)?;
        if decay.affected > 0 {
            println!("  Decayed {} memories by a factor of {}.", decay.affected, decay.factor);
        } else {
            println!("  No memories to decay.");
        }
    }

    println!("Looking for stale memories...");
    let result = maintenance::cleanup_stale(&mut conn, &config.memory, dry_run)?;

    if result.candidates.is_empty() {
        println!("  No stale memories found.");
        return Ok(());
    }

    if dry_run {
        println!(
            "  Found {} candidate(s) for cleanup (dry run, nothing deleted):\n",
            result.candidates.len()
        );
        println!("{:<38} {:<14} {:<10} Preview", "ID", "Type", "Importance");
        println!("{}", "-".repeat(90));
        for c in &result.candidates {
            println!(
                "{:<38} {:<14} {:<10.4} {}",
                c.id,
                c.memory_type,
                c.importance,
                super::preview(&c.content_preview, 60)
            );
        }
    } else {
        println!("  Deleted {} stale memories.", result.deleted);
    }

    Ok(())
}
