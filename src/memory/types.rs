//! Core memory type definitions.
//!
//! Defines [`MemoryType`] (where a memory came from), [`Memory`] (a full record),
//! and [`NewMemory`] (the input to the write path).

use serde::{Deserialize, Serialize};

/// Provenance of a memory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// A personal reflection the user wrote or confirmed.
    Personal,
    /// Derived from a completed chat exchange.
    Conversation,
    /// Extracted from a journal entry.
    Journal,
    /// A curated fact or preference about the user.
    Insight,
}

impl MemoryType {
    pub const ALL: [MemoryType; 4] = [
        Self::Personal,
        Self::Conversation,
        Self::Journal,
        Self::Insight,
    ];

    /// SQL-compatible string representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Personal => "personal",
            Self::Conversation => "conversation",
            Self::Journal => "journal",
            Self::Insight => "insight",
        }
    }
}

impl std::fmt::Display for MemoryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MemoryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "personal" => Ok(Self::Personal),
            "conversation" => Ok(Self::Conversation),
            "journal" => Ok(Self::Journal),
            "insight" => Ok(Self::Insight),
            _ => Err(format!("unknown memory type: {s}")),
        }
    }
}

/// A memory record, matching the `memories` table schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// UUID v7 (time-sortable) primary key.
    pub id: String,
    /// The full text content of the memory.
    pub content: String,
    /// Journal entry this memory was extracted from. A relation, not ownership.
    pub source_entry_id: Option<String>,
    #[serde(rename = "type")]
    pub memory_type: MemoryType,
    /// Retrieval priority in `[0.0, 1.0]`, decays over time unless pinned.
    pub importance: f64,
    pub tags: Vec<String>,
    /// Pinned memories are exempt from decay and cleanup.
    pub is_pinned: bool,
    /// Number of times retrieval has returned this memory.
    pub access_count: u32,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
    /// RFC 3339 timestamp of the last retrieval (creation time until then).
    pub last_accessed_at: String,
}

/// Input to [`crate::memory::store::add_memory`].
#[derive(Debug, Clone)]
pub struct NewMemory {
    pub content: String,
    pub memory_type: MemoryType,
    pub importance: f64,
    pub tags: Vec<String>,
    pub source_entry_id: Option<String>,
    pub is_pinned: bool,
}

impl NewMemory {
    pub fn new(content: impl Into<String>, memory_type: MemoryType) -> Self {
        Self {
            content: content.into(),
            memory_type,
            importance: 0.5,
            tags: Vec::new(),
            source_entry_id: None,
            is_pinned: false,
        }
    }

    pub fn importance(mut self, importance: f64) -> Self {
        self.importance = importance;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    pub fn source_entry(mut self, entry_id: impl Into<String>) -> Self {
        self.source_entry_id = Some(entry_id.into());
        self
    }

    pub fn pinned(mut self, pinned: bool) -> Self {
        self.is_pinned = pinned;
        self
    }
}

/// Normalize tags: trim, lower-case, drop empties and duplicates, keep first-seen order.
pub fn normalize_tags(tags: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(tags.len());
    for tag in tags {
        let t = tag.trim().to_lowercase();
        if !t.is_empty() && !out.contains(&t) {
            out.push(t);
        }
    }
    out
}
