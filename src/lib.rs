//! Gemi: a private, memory-augmented AI diary companion.
//!
//! Each chat exchange looks up related memories from earlier conversations, folds them
//! into the prompt, streams the reply from a local inference service and then stores a
//! new memory summarizing the exchange. Nothing leaves the machine.
//!
//! Memories are stored in four types:
//!
//! | Type | Source |
//! |------|--------|
//! | **Personal** | Reflections the user wrote or confirmed |
//! | **Conversation** | Written automatically after each completed chat reply |
//! | **Journal** | Extracted from a journal entry |
//! | **Insight** | Curated facts and preferences |
//!
//! # Architecture
//!
//! - **Storage**: SQLite with FTS5 keyword search, BM25 ranking weighted by importance
//! - **Inference**: any server speaking the Ollama chat API, streamed as NDJSON
//! - **Chat**: one cancellable streaming task per session, transcript writes keyed by
//!   message ownership
//!
//! # Modules
//!
//! - [`config`]: configuration loading from TOML files and environment variables
//! - [`db`]: SQLite database initialization, schema, migrations, and health checks
//! - [`memory`]: memory engine: store, search, forget, stats, and maintenance
//! - [`inference`]: inference service trait and the Ollama HTTP client
//! - [`chat`]: memory retrieval, prompt assembly and the streaming chat session

pub mod chat;
pub mod config;
pub mod db;
pub mod inference;
pub mod memory;
