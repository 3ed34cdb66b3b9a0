mod cli;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use gemi::config::GemiConfig;

#[derive(Parser)]
#[command(name = "gemi", version, about = "Private AI diary companion with memory")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Start an interactive conversation
    Chat,
    /// Send a single message and print the reply
    Ask {
        /// Message to send
        message: String,
    },
    /// Check that the inference service is up and the model is installed
    Status,
    /// Run database and inference diagnostics
    Doctor,
    /// Inspect and manage stored memories
    Memory {
        #[command(subcommand)]
        action: MemoryAction,
    },
}

#[derive(Subcommand)]
enum MemoryAction {
    /// List memories, pinned first then newest
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Keyword search, ranked like chat retrieval
    Search {
        query: String,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Show one memory with its audit log
    Show { id: String },
    /// Store a memory by hand
    Add {
        content: String,
        /// personal, conversation, journal or insight
        #[arg(long = "type", default_value = "personal")]
        memory_type: String,
        #[arg(long, default_value_t = 0.5)]
        importance: f64,
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// Journal entry this memory was taken from
        #[arg(long)]
        source_entry: Option<String>,
        #[arg(long)]
        pinned: bool,
    },
    /// Toggle the pin on a memory
    Pin { id: String },
    /// Set the importance of a memory (0.0 to 1.0)
    Importance { id: String, value: f64 },
    /// Delete a memory
    Delete { id: String },
    /// Delete all memories
    Clear {
        /// Also delete pinned memories
        #[arg(long)]
        include_pinned: bool,
        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
    /// Show memory statistics
    Stats,
    /// Apply importance decay and remove stale memories
    Maintain {
        /// List what would be removed without changing anything
        #[arg(long)]
        dry_run: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = GemiConfig::load()?;

    // Log to stderr so stdout carries only the conversation.
    let filter = EnvFilter::try_new(&config.general.log_level)
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Command::Chat => cli::chat::chat(&config).await?,
        Command::Ask { message } => cli::chat::ask(&config, &message).await?,
        Command::Status => cli::chat::status(&config).await?,
        Command::Doctor => cli::doctor::doctor(&config).await?,
        Command::Memory { action } => match action {
            MemoryAction::List { limit } => cli::memory::list(&config, limit)?,
            MemoryAction::Search { query, limit } => cli::search::search(&config, &query, limit)?,
            MemoryAction::Show { id } => cli::show::show(&config, &id)?,
            MemoryAction::Add {
                content,
                memory_type,
                importance,
                tags,
                source_entry,
                pinned,
            } => cli::memory::add(
                &config,
                cli::memory::AddArgs {
                    content: &content,
                    memory_type: &memory_type,
                    importance,
                    tags: &tags,
                    source_entry: source_entry.as_deref(),
                    pinned,
                },
            )?,
            MemoryAction::Pin { id } => cli::memory::pin(&config, &id)?,
            MemoryAction::Importance { id, value } => {
                cli::memory::importance(&config, &id, value)?
            }
            MemoryAction::Delete { id } => cli::memory::delete(&config, &id)?,
            MemoryAction::Clear {
                include_pinned,
                yes,
            } => cli::clear::clear(&config, include_pinned, yes)?,
            MemoryAction::Stats => cli::stats::stats(&config)?,
            MemoryAction::Maintain { dry_run } => cli::maintenance::maintain(&config, dry_run)?,
        },
    }

    Ok(())
}
