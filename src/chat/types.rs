use chrono::{DateTime, Utc};
use serde::Serialize;

/// One entry in the chat transcript.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub id: String,
    pub content: String,
    pub is_user: bool,
    pub timestamp: DateTime<Utc>,
    pub is_error: bool,
}

impl ChatMessage {
    fn new(content: String, is_user: bool, is_error: bool) -> Self {
        Self {
            id: uuid::Uuid::now_v7().to_string(),
            content,
            is_user,
            timestamp: Utc::now(),
            is_error,
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(content.into(), true, false)
    }

    /// Empty AI reply that a streaming task fills in.
    pub fn placeholder() -> Self {
        Self::new(String::new(), false, false)
    }

    /// AI-side message reporting a failure.
    pub fn error(content: impl Into<String>) -> Self {
        Self::new(content.into(), false, true)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum SessionState {
    Idle,
    UserMessageSubmitted,
    Streaming,
    Finalized,
    Cancelled,
    Errored,
}

/// Change notifications for whatever renders the transcript.
#[derive(Debug, Clone, PartialEq)]
pub enum ChatEvent {
    MessageAppended(ChatMessage),
    /// New full content of a message that is still streaming.
    MessageUpdated { id: String, content: String },
    /// The message will not change again.
    MessageFinalized(ChatMessage),
    GeneratingChanged(bool),
    TranscriptCleared,
}

/// How a streamed exchange ended.
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeOutcome {
    Finalized {
        message_id: String,
        content: String,
        /// Memory written for the exchange, if persistence succeeded.
        memory_id: Option<String>,
    },
    Cancelled {
        message_id: String,
    },
    Errored {
        message_id: String,
        error: String,
    },
}

impl ExchangeOutcome {
    pub fn message_id(&self) -> &str {
        match self {
            Self::Finalized { message_id, .. }
            | Self::Cancelled { message_id }
            | Self::Errored { message_id, .. } => message_id,
        }
    }
}
