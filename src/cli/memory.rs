//! CLI memory management: `list`, `add`, `pin`, `importance` and `delete`.

use anyhow::{Context, Result};

use gemi::config::GemiConfig;
use gemi::memory::types::{MemoryType, NewMemory};
use gemi::memory::{forget, search, store};

pub fn list(config: &GemiConfig, limit: usize) -> Result<()> {
    let conn = super::open_db(config)?;
    let memories = search::get_all_memories(&conn, limit)?;

    if memories.is_empty() {
        println!("No memories yet.");
        return Ok(());
    }

    println!("{:<38} {:<14} {:<6} {:<4} Preview", "ID", "Type", "Imp.", "Pin");
    println!("{}", "-".repeat(100));
    for m in &memories {
        println!(
            "{:<38} {:<14} {:<6.2} {:<4} {}",
            m.id,
            m.memory_type,
            m.importance,
            if m.is_pinned { "*" } else { "" },
            super::preview(&m.content, 60),
        );
    }
    Ok(())
}

pub struct AddArgs<'a> {
    pub content: &'a str,
    pub memory_type: &'a str,
    pub importance: f64,
    pub tags: &'a [String],
    pub source_entry: Option<&'a str>,
    pub pinned: bool,
}

pub fn add(config: &GemiConfig, args: AddArgs<'_>) -> Result<()> {
    let memory_type: MemoryType = args.memory_type.parse().map_err(anyhow::Error::msg)?;
    anyhow::ensure!(
        (0.0..=1.0).contains(&args.importance),
        "importance must be between 0.0 and 1.0, got {}",
        args.importance
    );

    let mut new = NewMemory::new(args.content, memory_type)
        .importance(args.importance)
        .tags(args.tags.iter().cloned())
        .pinned(args.pinned);
    if let Some(entry) = args.source_entry {
        new = new.source_entry(entry);
    }

    let mut conn = super::open_db(config)?;
    let memory = store::add_memory(&mut conn, new)?;
    println!("Stored {} memory {}", memory.memory_type, memory.id);
    Ok(())
}

pub fn pin(config: &GemiConfig, id: &str) -> Result<()> {
    let conn = super::open_db(config)?;
    let pinned = store::toggle_pin(&conn, id)?;
    let memory = store::reload(&conn, id)?;
    println!(
        "{} {id}: {}",
        if pinned { "Pinned" } else { "Unpinned" },
        super::preview(&memory.content, 60)
    );
    Ok(())
}

pub fn importance(config: &GemiConfig, id: &str, value: f64) -> Result<()> {
    let conn = super::open_db(config)?;
    store::update_importance(&conn, id, value)
        .with_context(|| format!("failed to update importance of {id}"))?;
    let memory = store::reload(&conn, id)?;
    println!(
        "Importance of {id} set to {:.2}: {}",
        memory.importance,
        super::preview(&memory.content, 60)
    );
    Ok(())
}

pub fn delete(config: &GemiConfig, id: &str) -> Result<()> {
    let mut conn = super::open_db(config)?;
    forget::delete_memory(&mut conn, id, Some("deleted from the command line"))?;
    println!("Deleted {id}");
    Ok(())
}
