//! The streaming chat session.
//!
//! A submission appends the user's message, checks that the inference service is
//! up, appends an empty AI placeholder and spawns one task that retrieves memories,
//! assembles the prompt and streams the reply into the placeholder. At most one such
//! task runs per session; a new submission cancels the previous one first.
//!
//! Transcript and state live behind a `std::sync::Mutex` that is never held across
//! an await. Each write from a task is checked against the transcript's owner id
//! under that lock, so a cancelled task can no longer touch its message even if it
//! has not observed its cancellation token yet.

use futures_util::StreamExt;
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::context::{create_prompt_with_memory, retrieve_relevant_memories, PromptBudget};
use super::transcript::Transcript;
use super::types::{ChatEvent, ChatMessage, ExchangeOutcome, SessionState};
use crate::config::ChatConfig;
use crate::inference::{InferenceError, InferenceService};
use crate::memory::service::MemoryStore;

const EVENT_CAPACITY: usize = 256;

/// Result of [`ChatSession::send_message`].
#[derive(Debug)]
pub enum Submission {
    /// Blank input; nothing happened.
    Ignored,
    /// The inference service was down. `message_id` is the error message appended.
    Unavailable { message_id: String },
    /// A reply is streaming.
    Streaming(PendingReply),
}

/// Handle on a running exchange.
#[derive(Debug)]
pub struct PendingReply {
    message_id: String,
    handle: JoinHandle<ExchangeOutcome>,
}

impl PendingReply {
    /// Id of the AI message being streamed.
    pub fn message_id(&self) -> &str {
        &self.message_id
    }

    /// Wait for the exchange to settle, including the history and memory write-back.
    pub async fn wait(self) -> ExchangeOutcome {
        match self.handle.await {
            Ok(outcome) => outcome,
            Err(e) => {
                tracing::error!(error = %e, message_id = %self.message_id, "exchange task failed");
                ExchangeOutcome::Cancelled {
                    message_id: self.message_id,
                }
            }
        }
    }
}

struct ActiveExchange {
    message_id: String,
    token: CancellationToken,
}

struct SessionInner {
    transcript: Transcript,
    state: SessionState,
    active: Option<ActiveExchange>,
}

struct Shared {
    inference: Arc<dyn InferenceService>,
    memory: Arc<dyn MemoryStore>,
    config: ChatConfig,
    inner: Mutex<SessionInner>,
    submit_lock: tokio::sync::Mutex<()>,
    events: broadcast::Sender<ChatEvent>,
}

/// Cheap to clone; clones share the same conversation.
#[derive(Clone)]
pub struct ChatSession {
    shared: Arc<Shared>,
}

impl ChatSession {
    pub fn new(
        inference: Arc<dyn InferenceService>,
        memory: Arc<dyn MemoryStore>,
        config: ChatConfig,
    ) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            shared: Arc::new(Shared {
                inference,
                memory,
                config,
                inner: Mutex::new(SessionInner {
                    transcript: Transcript::new(),
                    state: SessionState::Idle,
                    active: None,
                }),
                submit_lock: tokio::sync::Mutex::new(()),
                events,
            }),
        }
    }

    /// Submit a user message. Never fails; problems end up in the transcript.
    pub async fn send_message(&self, text: &str) -> Submission {
        let text = text.trim();
        if text.is_empty() {
            tracing::debug!("ignoring blank message");
            return Submission::Ignored;
        }

        let _submit = self.shared.submit_lock.lock().await;
        self.shared.cancel_active();

        let user = ChatMessage::user(text);
        {
            let mut inner = self.shared.lock();
            inner.transcript.push(user.clone());
            inner.state = SessionState::UserMessageSubmitted;
        }
        self.shared.emit(ChatEvent::MessageAppended(user));

        if !self.shared.inference.check_status().await {
            let error = InferenceError::Unavailable {
                url: self.shared.inference.location(),
                reason: "status check failed".to_string(),
            };
            let message = ChatMessage::error(error.user_message());
            let message_id = message.id.clone();
            {
                let mut inner = self.shared.lock();
                inner.transcript.push(message.clone());
                inner.state = SessionState::Errored;
            }
            tracing::warn!(location = %self.shared.inference.location(), "inference service unavailable");
            self.shared.emit(ChatEvent::MessageAppended(message.clone()));
            self.shared.emit(ChatEvent::MessageFinalized(message));
            return Submission::Unavailable { message_id };
        }

        let placeholder = ChatMessage::placeholder();
        let message_id = placeholder.id.clone();
        let token = CancellationToken::new();
        {
            let mut inner = self.shared.lock();
            inner.transcript.push(placeholder.clone());
            inner.transcript.claim(&message_id);
            inner.active = Some(ActiveExchange {
                message_id: message_id.clone(),
                token: token.clone(),
            });
            inner.state = SessionState::Streaming;
        }
        self.shared.emit(ChatEvent::MessageAppended(placeholder));
        self.shared.emit(ChatEvent::GeneratingChanged(true));

        tracing::info!(%message_id, chars = text.len(), "exchange started");
        let handle = tokio::spawn(run_exchange(
            Arc::clone(&self.shared),
            text.to_string(),
            message_id.clone(),
            token,
        ));

        Submission::Streaming(PendingReply { message_id, handle })
    }

    /// Stop the reply being generated, keeping whatever arrived so far.
    /// Returns false if nothing was streaming.
    pub fn cancel(&self) -> bool {
        self.shared.cancel_active()
    }

    /// Cancel any reply, empty the transcript and reset the model's conversation state.
    pub async fn clear(&self) {
        let _submit = self.shared.submit_lock.lock().await;
        self.shared.cancel_active();
        {
            let mut inner = self.shared.lock();
            inner.transcript.clear();
            inner.state = SessionState::Idle;
        }
        self.shared.emit(ChatEvent::TranscriptCleared);
        self.shared.inference.clear_context().await;
        tracing::info!("conversation cleared");
    }

    pub fn messages(&self) -> Vec<ChatMessage> {
        self.shared.lock().transcript.messages().to_vec()
    }

    pub fn is_generating(&self) -> bool {
        self.shared.lock().active.is_some()
    }

    pub fn state(&self) -> SessionState {
        self.shared.lock().state
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ChatEvent> {
        self.shared.events.subscribe()
    }
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, SessionInner> {
        // A panic while holding the lock leaves plain data behind; keep serving it.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn emit(&self, event: ChatEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn cancel_active(&self) -> bool {
        let settled = {
            let mut inner = self.lock();
            let Some(active) = inner.active.take() else {
                return false;
            };
            active.token.cancel();
            inner.transcript.release(&active.message_id);
            inner.state = SessionState::Cancelled;
            tracing::info!(message_id = %active.message_id, "exchange cancelled");
            inner.transcript.get(&active.message_id).cloned()
        };
        if let Some(message) = settled {
            self.emit(ChatEvent::MessageFinalized(message));
        }
        self.emit(ChatEvent::GeneratingChanged(false));
        true
    }

    /// Write the accumulated reply. False once the task lost ownership.
    fn apply_chunk(&self, message_id: &str, content: &str) -> bool {
        let applied = self.lock().transcript.replace_content(message_id, content);
        if applied {
            self.emit(ChatEvent::MessageUpdated {
                id: message_id.to_string(),
                content: content.to_string(),
            });
        }
        applied
    }

    fn settle(
        &self,
        message_id: &str,
        content: String,
        is_error: bool,
        state: SessionState,
    ) -> Option<ChatMessage> {
        let settled = {
            let mut inner = self.lock();
            let settled = inner.transcript.finalize(message_id, content, is_error)?;
            if inner
                .active
                .as_ref()
                .is_some_and(|a| a.message_id == message_id)
            {
                inner.active = None;
            }
            inner.state = state;
            settled
        };
        self.emit(ChatEvent::MessageFinalized(settled.clone()));
        self.emit(ChatEvent::GeneratingChanged(false));
        Some(settled)
    }

    fn fail(&self, message_id: String, partial: &str, error: InferenceError) -> ExchangeOutcome {
        let shown = error.user_message();
        let content = if partial.is_empty() {
            shown.clone()
        } else {
            format!("{partial}\n\n{shown}")
        };
        match self.settle(&message_id, content, true, SessionState::Errored) {
            Some(_) => {
                tracing::warn!(%message_id, error = %error, partial_chars = partial.len(), "exchange failed");
                ExchangeOutcome::Errored {
                    message_id,
                    error: shown,
                }
            }
            None => ExchangeOutcome::Cancelled { message_id },
        }
    }
}

async fn run_exchange(
    shared: Arc<Shared>,
    user_text: String,
    message_id: String,
    token: CancellationToken,
) -> ExchangeOutcome {
    let cancelled = |message_id: String| ExchangeOutcome::Cancelled { message_id };

    let memories = tokio::select! {
        biased;
        _ = token.cancelled() => return cancelled(message_id),
        found = retrieve_relevant_memories(
            shared.memory.as_ref(),
            &user_text,
            shared.config.memory_limit,
        ) => found,
    };
    let contents: Vec<String> = memories.into_iter().map(|m| m.content).collect();
    let prompt = create_prompt_with_memory(&user_text, &contents, &PromptBudget::from(&shared.config));

    let response_timeout = shared.config.response_timeout();
    let opened = tokio::select! {
        biased;
        _ = token.cancelled() => return cancelled(message_id),
        opened = tokio::time::timeout(response_timeout, shared.inference.chat_completion(&prompt)) => opened,
    };
    let mut stream = match opened {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => return shared.fail(message_id, "", e),
        Err(_) => return shared.fail(message_id, "", InferenceError::Timeout(response_timeout)),
    };

    let idle_timeout = shared.config.idle_timeout();
    let mut reply = String::new();
    loop {
        let next = tokio::select! {
            biased;
            _ = token.cancelled() => return cancelled(message_id),
            next = tokio::time::timeout(idle_timeout, stream.next()) => next,
        };
        match next {
            Ok(Some(Ok(chunk))) => {
                reply.push_str(&chunk);
                if !shared.apply_chunk(&message_id, &reply) {
                    return cancelled(message_id);
                }
            }
            Ok(Some(Err(e))) => return shared.fail(message_id, &reply, e),
            Ok(None) => break,
            Err(_) => return shared.fail(message_id, &reply, InferenceError::Timeout(idle_timeout)),
        }
    }
    drop(stream);

    if shared
        .settle(&message_id, reply.clone(), false, SessionState::Finalized)
        .is_none()
    {
        return cancelled(message_id);
    }
    tracing::info!(%message_id, chars = reply.len(), "exchange finalized");
    shared.inference.record_exchange(&user_text, &reply).await;

    let memory_id = match shared
        .memory
        .add_memory_from_conversation(&user_text, &reply)
        .await
    {
        Ok(memory) => {
            tracing::debug!(memory_id = %memory.id, "exchange remembered");
            Some(memory.id)
        }
        Err(e) => {
            tracing::warn!(error = %e, %message_id, "failed to store conversation memory");
            None
        }
    };

    ExchangeOutcome::Finalized {
        message_id,
        content: reply,
        memory_id,
    }
}
