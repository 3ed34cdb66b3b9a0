//! Async boundary over the synchronous memory engine.
//!
//! [`MemoryStore`] is what the chat session and the management commands depend on.
//! [`SqliteMemoryStore`] implements it over a shared `rusqlite::Connection`, running
//! every call on the blocking pool.

use anyhow::Result;
use async_trait::async_trait;
use rusqlite::Connection;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::config::MemoryConfig;
use crate::memory::stats::MemoryStats;
use crate::memory::types::Memory;
use crate::memory::{forget, search, stats, store};

/// Storage interface for memories.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    /// Most relevant first, at most `limit`.
    async fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<Memory>>;

    async fn add_memory_from_conversation(
        &self,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Memory>;

    async fn get_all_memories(&self, limit: usize) -> Result<Vec<Memory>>;

    async fn delete_memory(&self, memory_id: &str) -> Result<()>;

    /// Returns the new pin state.
    async fn toggle_memory_pin(&self, memory_id: &str) -> Result<bool>;

    async fn update_memory_importance(&self, memory_id: &str, importance: f64) -> Result<()>;

    async fn get_memory_stats(&self) -> Result<MemoryStats>;
}

/// [`MemoryStore`] backed by the SQLite engine in this crate.
#[derive(Clone)]
pub struct SqliteMemoryStore {
    db: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
    config: Arc<MemoryConfig>,
}

impl SqliteMemoryStore {
    pub fn new(conn: Connection, db_path: Option<PathBuf>, config: MemoryConfig) -> Self {
        Self {
            db: Arc::new(Mutex::new(conn)),
            db_path,
            config: Arc::new(config),
        }
    }

    /// Open the on-disk database at `path`.
    pub fn open(path: impl Into<PathBuf>, config: MemoryConfig) -> Result<Self> {
        let path = path.into();
        let conn = crate::db::open_database(&path)?;
        Ok(Self::new(conn, Some(path), config))
    }

    /// Fresh in-memory store, mostly for tests and dry runs.
    pub fn in_memory(config: MemoryConfig) -> Result<Self> {
        let conn = crate::db::open_memory_database()?;
        Ok(Self::new(conn, None, config))
    }

    /// Run `f` with the connection on the blocking pool.
    async fn with_conn<T, F>(&self, f: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Connection) -> Result<T> + Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || {
            let mut conn = db
                .lock()
                .map_err(|e| anyhow::anyhow!("db lock poisoned: {e}"))?;
            f(&mut conn)
        })
        .await
        .map_err(|e| anyhow::anyhow!("db task failed: {e}"))?
    }
}

#[async_trait]
impl MemoryStore for SqliteMemoryStore {
    async fn search_memories(&self, query: &str, limit: usize) -> Result<Vec<Memory>> {
        let query = query.to_string();
        self.with_conn(move |conn| search::search_memories(conn, &query, limit))
            .await
    }

    async fn add_memory_from_conversation(
        &self,
        user_message: &str,
        ai_response: &str,
    ) -> Result<Memory> {
        let user_message = user_message.to_string();
        let ai_response = ai_response.to_string();
        let config = Arc::clone(&self.config);
        self.with_conn(move |conn| {
            store::add_memory_from_conversation(conn, &user_message, &ai_response, &config)
        })
        .await
    }

    async fn get_all_memories(&self, limit: usize) -> Result<Vec<Memory>> {
        self.with_conn(move |conn| search::get_all_memories(conn, limit))
            .await
    }

    async fn delete_memory(&self, memory_id: &str) -> Result<()> {
        let memory_id = memory_id.to_string();
        self.with_conn(move |conn| forget::delete_memory(conn, &memory_id, Some("user request")))
            .await
    }

    async fn toggle_memory_pin(&self, memory_id: &str) -> Result<bool> {
        let memory_id = memory_id.to_string();
        self.with_conn(move |conn| store::toggle_pin(conn, &memory_id))
            .await
    }

    async fn update_memory_importance(&self, memory_id: &str, importance: f64) -> Result<()> {
        let memory_id = memory_id.to_string();
        self.with_conn(move |conn| store::update_importance(conn, &memory_id, importance))
            .await
    }

    async fn get_memory_stats(&self) -> Result<MemoryStats> {
        let db_path = self.db_path.clone();
        self.with_conn(move |conn| stats::memory_stats(conn, db_path.as_deref()))
            .await
    }
}
