use anyhow::Result;

use gemi::config::GemiConfig;
use gemi::memory::types::MemoryType;

/// Display memory statistics in the terminal.
pub fn stats(config: &GemiConfig) -> Result<()> {
    let db_path = config.resolved_db_path();
    let conn = super::open_db(config)?;

    let response = gemi::memory::stats::memory_stats(&conn, Some(&db_path))?;

    println!("Memory Statistics");
    println!("{}", "=".repeat(40));
    println!("  Total memories:      {}", response.total_memories);
    println!("  Pinned:              {}", response.pinned_memories);
    println!("  Average importance:  {:.2}", response.average_importance);
    println!("  Total retrievals:    {}", response.total_accesses);
    println!();

    println!("By Type:");
    for t in MemoryType::ALL {
        let count = response.by_type.get(t.as_str()).copied().unwrap_or(0);
        println!("  {:<14} {}", t, count);
    }
    println!();

    println!("Audit log entries:     {}", response.log_entries);
    println!("Database size:         {}", super::format_bytes(response.db_size_bytes));

    if let Some(ref oldest) = response.oldest_memory {
        println!("Oldest memory:         {oldest}");
    }
    if let Some(ref newest) = response.newest_memory {
        println!("Newest memory:         {newest}");
    }

    Ok(())
}
