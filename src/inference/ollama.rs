//! Client for servers speaking the Ollama chat API.
//!
//! `POST /api/chat` streams newline-delimited JSON; `GET /api/tags` lists installed
//! models and doubles as the health check. Finalized exchanges are kept as chat
//! history and replayed ahead of the next prompt until
//! [`InferenceService::clear_context`] is called. History holds the user's words
//! and the replies only, and is bounded both by `max_history_messages` and by
//! `history_char_budget`, always in whole user/assistant pairs.

use async_trait::async_trait;
use futures_util::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use super::stream::decode_chat_stream;
use super::{InferenceError, InferenceService, TokenStream};
use crate::config::InferenceConfig;

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct WireMessage {
    pub role: &'static str,
    pub content: String,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
    top_p: f32,
    top_k: u32,
    repeat_penalty: f32,
    num_predict: u32,
    num_ctx: u32,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<WireMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagModel>,
}

#[derive(Debug, Deserialize)]
struct TagModel {
    name: String,
}

pub struct OllamaClient {
    http: reqwest::Client,
    config: InferenceConfig,
    history: Mutex<Vec<WireMessage>>,
}

impl OllamaClient {
    pub fn new(config: InferenceConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        tracing::debug!(base_url = %config.base_url, model = %config.model, "inference client ready");
        Ok(Self {
            http,
            config,
            history: Mutex::new(Vec::new()),
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Snapshot of the carried conversation history.
    pub fn history(&self) -> Vec<WireMessage> {
        self.history
            .lock()
            .map(|h| h.clone())
            .unwrap_or_default()
    }

    fn request_messages(&self, prompt: &str) -> Vec<WireMessage> {
        let history = self.history();
        let mut messages = replay_window(&history, self.config.history_char_budget).to_vec();
        messages.push(WireMessage {
            role: "user",
            content: prompt.to_string(),
        });
        messages
    }

    fn options(&self) -> ChatOptions {
        ChatOptions {
            temperature: self.config.temperature,
            top_p: self.config.top_p,
            top_k: self.config.top_k,
            repeat_penalty: self.config.repeat_penalty,
            num_predict: self.config.num_predict,
            num_ctx: self.config.num_ctx,
        }
    }
}

/// Whether an installed model name satisfies the configured one.
///
/// `gemma3n` matches `gemma3n:latest` and vice versa; differing tags do not match.
fn model_matches(installed: &str, wanted: &str) -> bool {
    if installed == wanted {
        return true;
    }
    let base = |name: &str| name.split(':').next().unwrap_or(name).to_string();
    let tag = |name: &str| name.split_once(':').map(|(_, t)| t.to_string());
    if base(installed) != base(wanted) {
        return false;
    }
    match (tag(installed), tag(wanted)) {
        (Some(a), Some(b)) => a == b,
        _ => true,
    }
}

/// Append one exchange, then drop the oldest pairs beyond `max` messages.
fn push_exchange(history: &mut Vec<WireMessage>, user_message: &str, reply: &str, max: usize) {
    history.push(WireMessage {
        role: "user",
        content: user_message.to_string(),
    });
    history.push(WireMessage {
        role: "assistant",
        content: reply.to_string(),
    });
    let keep = max - max % 2;
    if history.len() > keep {
        let excess = history.len() - keep;
        history.drain(..excess);
    }
}

/// Newest whole pairs of `history` whose combined content fits in `budget` chars.
fn replay_window(history: &[WireMessage], budget: usize) -> &[WireMessage] {
    let mut used = 0;
    let mut start = history.len();
    for pair in history.rchunks_exact(2) {
        let size: usize = pair.iter().map(|m| m.content.chars().count()).sum();
        if used + size > budget {
            break;
        }
        used += size;
        start -= 2;
    }
    &history[start..]
}

#[async_trait]
impl InferenceService for OllamaClient {
    async fn chat_completion(&self, prompt: &str) -> Result<TokenStream, InferenceError> {
        let url = self.endpoint("/api/chat");
        let request = ChatRequest {
            model: &self.config.model,
            messages: self.request_messages(prompt),
            stream: true,
            options: self.options(),
        };

        tracing::debug!(%url, prompt_chars = prompt.len(), "opening chat stream");
        let response = self
            .http
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| InferenceError::Unavailable {
                url: self.config.base_url.clone(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), %body, "chat request rejected");
            return Err(InferenceError::Http {
                status: status.as_u16(),
                body,
            });
        }

        Ok(decode_chat_stream(response.bytes_stream().boxed()))
    }

    async fn check_status(&self) -> bool {
        let url = self.endpoint("/api/tags");
        let response = match self
            .http
            .get(&url)
            .timeout(self.config.status_timeout())
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(%url, error = %e, "inference service unreachable");
                return false;
            }
        };

        if !response.status().is_success() {
            tracing::warn!(%url, status = response.status().as_u16(), "status check failed");
            return false;
        }

        let tags: TagsResponse = match response.json().await {
            Ok(t) => t,
            Err(e) => {
                tracing::warn!(%url, error = %e, "unreadable model list");
                return false;
            }
        };

        if tags.models.is_empty() {
            tracing::warn!("inference service has no models installed");
            return false;
        }

        let ready = tags
            .models
            .iter()
            .any(|m| model_matches(&m.name, &self.config.model));
        if !ready {
            tracing::warn!(model = %self.config.model, "configured model is not installed");
        }
        ready
    }

    async fn record_exchange(&self, user_message: &str, reply: &str) {
        if let Ok(mut history) = self.history.lock() {
            push_exchange(&mut history, user_message, reply, self.config.max_history_messages);
        }
    }

    async fn clear_context(&self) {
        if let Ok(mut history) = self.history.lock() {
            history.clear();
        }
        tracing::debug!("inference context cleared");
    }

    fn location(&self) -> String {
        self.config.base_url.clone()
    }
}
