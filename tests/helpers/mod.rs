#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::stream;
use rusqlite::Connection;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};

use gemi::chat::ChatEvent;
use gemi::inference::{InferenceError, InferenceService, TokenStream};
use gemi::memory::service::MemoryStore;
use gemi::memory::stats::MemoryStats;
use gemi::memory::types::{Memory, MemoryType, NewMemory};

/// Open a fresh in-memory database with schema and migrations applied.
pub fn test_db() -> Connection {
    gemi::db::open_memory_database().unwrap()
}

/// Insert a test memory directly via the store module. Returns the memory ID.
pub fn insert_memory(
    conn: &mut Connection,
    content: &str,
    memory_type: MemoryType,
    importance: f64,
) -> String {
    gemi::memory::store::add_memory(
        conn,
        NewMemory::new(content, memory_type).importance(importance),
    )
    .unwrap()
    .id
}

/// Backdate `last_accessed_at` so the memory looks untouched for `days`.
pub fn backdate_access(conn: &Connection, id: &str, days: i64) {
    let then = (chrono::Utc::now() - chrono::Duration::days(days)).to_rfc3339();
    conn.execute(
        "UPDATE memories SET last_accessed_at = ?1 WHERE id = ?2",
        rusqlite::params![then, id],
    )
    .unwrap();
}

pub fn memory(content: &str) -> Memory {
    let now = chrono::Utc::now().to_rfc3339();
    Memory {
        id: uuid::Uuid::now_v7().to_string(),
        content: content.to_string(),
        source_entry_id: None,
        memory_type: MemoryType::Personal,
        importance: 0.5,
        tags: Vec::new(),
        is_pinned: false,
        access_count: 0,
        created_at: now.clone(),
        last_accessed_at: now,
    }
}

// ── Scripted inference ──────────────────────────────────────────────────────

pub type ChunkSender = mpsc::UnboundedSender<Result<String, InferenceError>>;

/// What the next `chat_completion` call does.
pub enum Reply {
    /// Stream these chunks and finish.
    Chunks(Vec<String>),
    /// Stream whatever the test pushes; ends when the sender is dropped.
    Controlled(mpsc::UnboundedReceiver<Result<String, InferenceError>>),
    /// Fail before a stream is opened.
    OpenError(InferenceError),
    /// Never get as far as opening a stream.
    NeverOpens,
    /// Open a stream that never yields.
    Hang,
}

impl Reply {
    pub fn chunks(parts: &[&str]) -> Self {
        Self::Chunks(parts.iter().map(|p| p.to_string()).collect())
    }

    pub fn controlled() -> (Self, ChunkSender) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::Controlled(rx), tx)
    }
}

/// In-process [`InferenceService`] driven by a queue of [`Reply`] scripts.
///
/// An empty queue answers with a single "ok" chunk.
pub struct ScriptedInference {
    replies: Mutex<VecDeque<Reply>>,
    prompts: Mutex<Vec<String>>,
    recorded: Mutex<Vec<(String, String)>>,
    available: AtomicBool,
    status_checks: AtomicUsize,
    clears: AtomicUsize,
}

impl ScriptedInference {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            replies: Mutex::new(VecDeque::new()),
            prompts: Mutex::new(Vec::new()),
            recorded: Mutex::new(Vec::new()),
            available: AtomicBool::new(true),
            status_checks: AtomicUsize::new(0),
            clears: AtomicUsize::new(0),
        })
    }

    pub fn push(&self, reply: Reply) {
        self.replies.lock().unwrap().push_back(reply);
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }

    /// Exchanges the session handed back as conversation history.
    pub fn recorded(&self) -> Vec<(String, String)> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn status_checks(&self) -> usize {
        self.status_checks.load(Ordering::SeqCst)
    }

    pub fn clears(&self) -> usize {
        self.clears.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl InferenceService for ScriptedInference {
    async fn chat_completion(&self, prompt: &str) -> Result<TokenStream, InferenceError> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Reply::chunks(&["ok"]));

        match reply {
            Reply::Chunks(parts) => Ok(Box::pin(stream::iter(parts.into_iter().map(Ok::<String, InferenceError>)))),
            Reply::Controlled(rx) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv().await.map(|item| (item, rx))
            }))),
            Reply::OpenError(e) => Err(e),
            Reply::NeverOpens => std::future::pending().await,
            Reply::Hang => Ok(Box::pin(stream::pending::<Result<String, InferenceError>>())),
        }
    }

    async fn check_status(&self) -> bool {
        self.status_checks.fetch_add(1, Ordering::SeqCst);
        self.available.load(Ordering::SeqCst)
    }

    async fn record_exchange(&self, user_message: &str, reply: &str) {
        self.recorded
            .lock()
            .unwrap()
            .push((user_message.to_string(), reply.to_string()));
    }

    async fn clear_context(&self) {
        self.clears.fetch_add(1, Ordering::SeqCst);
    }

    fn location(&self) -> String {
        "http://localhost:11434".to_string()
    }
}

// ── Static memory store ─────────────────────────────────────────────────────

/// [`MemoryStore`] that returns fixed search results and records write-backs.
#[derive(Default)]
pub struct StaticStore {
    pub results: Vec<Memory>,
    pub fail_search: bool,
    pub fail_writes: bool,
    pub searches: Mutex<Vec<String>>,
    pub written: Mutex<Vec<(String, String)>>,
}

impl StaticStore {
    pub fn with_results(contents: &[&str]) -> Arc<Self> {
        Arc::new(Self {
            results: contents.iter().map(|c| memory(c)).collect(),
            ..Self::default()
        })
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_search: true,
            fail_writes: true,
            ..Self::default()
        })
    }

    /// Searches fail, write-backs still succeed.
    pub fn failing_search() -> Arc<Self> {
        Arc::new(Self {
            fail_search: true,
            ..Self::default()
        })
    }

    pub fn written(&self) -> Vec<(String, String)> {
        self.written.lock().unwrap().clone()
    }
}

#[async_trait]
impl MemoryStore for StaticStore {
    async fn search_memories(&self, query: &str, limit: usize) -> anyhow::Result<Vec<Memory>> {
        self.searches.lock().unwrap().push(query.to_string());
        if self.fail_search {
            anyhow::bail!("disk I/O error");
        }
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    async fn add_memory_from_conversation(
        &self,
        user_message: &str,
        ai_response: &str,
    ) -> anyhow::Result<Memory> {
        if self.fail_writes {
            anyhow::bail!("database is locked");
        }
        self.written
            .lock()
            .unwrap()
            .push((user_message.to_string(), ai_response.to_string()));
        Ok(memory(&format!("User shared: {user_message}\nGemi replied: {ai_response}")))
    }

    async fn get_all_memories(&self, limit: usize) -> anyhow::Result<Vec<Memory>> {
        Ok(self.results.iter().take(limit).cloned().collect())
    }

    async fn delete_memory(&self, memory_id: &str) -> anyhow::Result<()> {
        anyhow::bail!("memory not found: {memory_id}")
    }

    async fn toggle_memory_pin(&self, memory_id: &str) -> anyhow::Result<bool> {
        anyhow::bail!("memory not found: {memory_id}")
    }

    async fn update_memory_importance(&self, memory_id: &str, _importance: f64) -> anyhow::Result<()> {
        anyhow::bail!("memory not found: {memory_id}")
    }

    async fn get_memory_stats(&self) -> anyhow::Result<MemoryStats> {
        Ok(MemoryStats::default())
    }
}

// ── Event helpers ───────────────────────────────────────────────────────────

/// Wait for the first event matching `pred`, failing the test after two seconds.
pub async fn wait_for_event<F>(events: &mut broadcast::Receiver<ChatEvent>, mut pred: F) -> ChatEvent
where
    F: FnMut(&ChatEvent) -> bool,
{
    tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let event = events.recv().await.expect("event channel closed");
            if pred(&event) {
                return event;
            }
        }
    })
    .await
    .expect("timed out waiting for chat event")
}
