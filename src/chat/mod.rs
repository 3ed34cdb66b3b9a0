//! Memory-augmented streaming chat.

pub mod context;
pub mod session;
pub mod transcript;
pub mod types;

pub use context::{create_prompt_with_memory, retrieve_relevant_memories, PromptBudget};
pub use session::{ChatSession, PendingReply, Submission};
pub use types::{ChatEvent, ChatMessage, ExchangeOutcome, SessionState};
