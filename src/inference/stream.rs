//! Decoding of streamed chat responses.
//!
//! The inference server answers with one JSON object per line. Lines may carry an
//! SSE `data: ` prefix, and `[DONE]` may close the stream. Each object holds the next
//! piece of text (`message.content`, or `response` for the generate format), a `done`
//! flag, or an `error`.

use futures_util::{Stream, StreamExt};
use serde::Deserialize;
use std::fmt::Display;

use super::{InferenceError, TokenStream};

#[derive(Debug, Deserialize)]
struct ChunkMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    message: Option<ChunkMessage>,
    response: Option<String>,
    #[serde(default)]
    done: bool,
    error: Option<String>,
}

/// One decoded line of the response body.
#[derive(Debug, Clone, PartialEq)]
pub enum LineEvent {
    Token(String),
    /// Completion marker, with any text the final object still carried.
    Done(String),
}

/// Decode a single line. Blank and unparseable lines yield `Ok(None)`.
pub fn parse_line(line: &str) -> Result<Option<LineEvent>, InferenceError> {
    let line = line.trim();
    let payload = line.strip_prefix("data:").map(str::trim_start).unwrap_or(line);
    if payload.is_empty() {
        return Ok(None);
    }
    if payload == "[DONE]" {
        return Ok(Some(LineEvent::Done(String::new())));
    }

    let chunk: ChatChunk = match serde_json::from_str(payload) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!(error = %e, line = %payload, "skipping unparseable stream line");
            return Ok(None);
        }
    };

    if let Some(error) = chunk.error {
        return Err(InferenceError::Remote(error));
    }

    let text = chunk
        .message
        .map(|m| m.content)
        .or(chunk.response)
        .unwrap_or_default();

    if chunk.done {
        Ok(Some(LineEvent::Done(text)))
    } else if text.is_empty() {
        Ok(None)
    } else {
        Ok(Some(LineEvent::Token(text)))
    }
}

/// Turn a raw byte stream into a [`TokenStream`].
///
/// The stream ends cleanly only after a completion marker. A body that ends without
/// one is reported as [`InferenceError::Stream`].
pub fn decode_chat_stream<S, B, E>(bytes: S) -> TokenStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Display + Send + 'static,
{
    let stream = async_stream::stream! {
        let mut buffer: Vec<u8> = Vec::new();
        let mut finished = false;
        futures_util::pin_mut!(bytes);

        'read: while let Some(chunk) = bytes.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(InferenceError::Stream(e.to_string()));
                    return;
                }
            };
            buffer.extend_from_slice(chunk.as_ref());

            // Split on raw newlines so multi-byte characters never straddle a decode
            while let Some(pos) = buffer.iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=pos).collect();
                match parse_line(&String::from_utf8_lossy(&line)) {
                    Ok(Some(LineEvent::Token(text))) => { yield Ok(text); }
                    Ok(Some(LineEvent::Done(text))) => {
                        if !text.is_empty() {
                            yield Ok(text);
                        }
                        finished = true;
                        break 'read;
                    }
                    Ok(None) => {}
                    Err(e) => {
                        yield Err(e);
                        return;
                    }
                }
            }
        }

        // Trailing object without a final newline
        if !finished && !buffer.is_empty() {
            match parse_line(&String::from_utf8_lossy(&buffer)) {
                Ok(Some(LineEvent::Token(text))) => { yield Ok(text); }
                Ok(Some(LineEvent::Done(text))) => {
                    if !text.is_empty() {
                        yield Ok(text);
                    }
                    finished = true;
                }
                Ok(None) => {}
                Err(e) => {
                    yield Err(e);
                    return;
                }
            }
        }

        if !finished {
            yield Err(InferenceError::Stream(
                "connection closed before the response completed".to_string(),
            ));
        }
    };
    Box::pin(stream)
}
