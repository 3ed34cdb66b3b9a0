use anyhow::Result;

use gemi::config::GemiConfig;

/// Run a keyword search from the terminal, ranked the way chat retrieval ranks.
pub fn search(config: &GemiConfig, query: &str, limit: usize) -> Result<()> {
    let conn = super::open_db(config)?;
    let results = gemi::memory::search::search_memories(&conn, query, limit)?;

    if results.is_empty() {
        println!("No results found.");
        return Ok(());
    }

    println!("Found {} result(s)\n", results.len());

    for (i, memory) in results.iter().enumerate() {
        println!(
            "  {}. [{}] {} (importance: {:.2}{})",
            i + 1,
            memory.memory_type,
            memory.id,
            memory.importance,
            if memory.is_pinned { ", pinned" } else { "" },
        );
        println!("     {}", super::preview(&memory.content, 120));
        println!();
    }

    Ok(())
}
