//! Local inference service boundary.
//!
//! Provides the [`InferenceService`] trait the chat session streams through and an
//! Ollama-compatible HTTP implementation. The service is created via
//! [`create_service`] from configuration.

pub mod ollama;
pub mod stream;

use async_trait::async_trait;
use futures_util::Stream;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Lazily produced response chunks, in generation order.
///
/// Dropping the stream abandons the request.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, InferenceError>> + Send>>;

#[derive(Debug, Error)]
pub enum InferenceError {
    #[error("inference service unreachable at {url}: {reason}")]
    Unavailable { url: String, reason: String },

    #[error("inference service returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("stream read failed: {0}")]
    Stream(String),

    #[error("inference service reported an error: {0}")]
    Remote(String),

    #[error("no response from the inference service within {0:?}")]
    Timeout(Duration),
}

impl InferenceError {
    /// Text shown to the user in the transcript.
    pub fn user_message(&self) -> String {
        match self {
            Self::Unavailable { url, .. } => format!(
                "Gemi can't reach the local AI model at {url}. \
                 Start the inference service (`ollama serve`) and try again."
            ),
            Self::Http { status: 404, .. } => {
                "The AI model isn't installed yet. Pull it with `ollama pull` and try again."
                    .to_string()
            }
            Self::Http { status: 503, .. } => {
                "The AI model is still loading. Give it a moment and try again.".to_string()
            }
            Self::Http { status, .. } => {
                format!("The AI model returned an error (HTTP {status}). Please try again.")
            }
            Self::Stream(_) => {
                "The connection to the AI model was interrupted. Please try again.".to_string()
            }
            Self::Remote(reason) => format!("The AI model ran into a problem: {reason}"),
            Self::Timeout(_) => {
                "The AI model took too long to respond. Check that the inference service is \
                 running and try again."
                    .to_string()
            }
        }
    }
}

/// A local inference runtime that turns a prompt into a token stream.
#[async_trait]
pub trait InferenceService: Send + Sync {
    /// Open a token stream for `prompt`. Errors here mean no stream was opened.
    async fn chat_completion(&self, prompt: &str) -> Result<TokenStream, InferenceError>;

    /// Whether the service is up and has the configured model ready.
    async fn check_status(&self) -> bool;

    /// Keep a completed exchange as conversation state for later requests.
    ///
    /// Called with the user's own words, not the assembled prompt, and only for
    /// replies that were finalized.
    async fn record_exchange(&self, user_message: &str, reply: &str);

    /// Drop any conversation state carried between requests.
    async fn clear_context(&self);

    /// Where the service lives, for error messages.
    fn location(&self) -> String;
}

/// Create an inference service from config.
///
/// Currently only `"ollama"` is supported (any server speaking the Ollama chat API).
pub fn create_service(
    config: &crate::config::InferenceConfig,
) -> anyhow::Result<Arc<dyn InferenceService>> {
    match config.provider.as_str() {
        "ollama" => {
            let client = ollama::OllamaClient::new(config.clone())?;
            Ok(Arc::new(client))
        }
        other => anyhow::bail!("unknown inference provider: {other}. Supported: ollama"),
    }
}
