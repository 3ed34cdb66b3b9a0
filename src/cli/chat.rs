//! Terminal front-end for the chat session: `chat`, `ask` and `status`.

use anyhow::{bail, Result};
use std::future::Future;
use std::io::Write;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};
use tokio::sync::broadcast;

use gemi::chat::{ChatEvent, ChatSession, ExchangeOutcome, PendingReply, Submission};
use gemi::config::GemiConfig;
use gemi::inference::{self, InferenceService};
use gemi::memory::service::SqliteMemoryStore;

fn build_session(config: &GemiConfig) -> Result<ChatSession> {
    let store = SqliteMemoryStore::open(config.resolved_db_path(), config.memory.clone())?;
    let service = inference::create_service(&config.inference)?;
    Ok(ChatSession::new(service, Arc::new(store), config.chat.clone()))
}

/// Interactive conversation. Ctrl-C stops the current reply or, at the prompt,
/// leaves. `/clear` starts over; `/quit` or end of input also leaves.
pub async fn chat(config: &GemiConfig) -> Result<()> {
    let session = build_session(config)?;
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    println!("Gemi ({} via {})", config.inference.model, config.inference.base_url);
    println!("Type /clear to start over, /quit to leave. Ctrl-C stops a reply.");

    loop {
        print!("\nyou> ");
        std::io::stdout().flush()?;

        let Some(line) = next_input(&mut lines, tokio::signal::ctrl_c()).await? else {
            break;
        };
        match line.trim() {
            "/quit" | "/exit" => break,
            "/clear" => {
                session.clear().await;
                println!("(conversation cleared)");
                continue;
            }
            _ => {}
        }

        let events = session.subscribe();
        match session.send_message(&line).await {
            Submission::Ignored => {}
            Submission::Unavailable { message_id } => print_message(&session, &message_id),
            Submission::Streaming(pending) => {
                stream_reply(&session, pending, events).await?;
            }
        }
    }

    Ok(())
}

/// Read the next prompt line. `None` on end of input or when `interrupt` fires.
///
/// Once a reply has listened for Ctrl-C the default SIGINT exit is gone for the
/// rest of the process, so the prompt has to watch for it too.
async fn next_input<R, F>(lines: &mut Lines<R>, interrupt: F) -> Result<Option<String>>
where
    R: AsyncBufRead + Unpin,
    F: Future<Output = std::io::Result<()>>,
{
    tokio::select! {
        line = lines.next_line() => Ok(line?),
        _ = interrupt => {
            println!();
            Ok(None)
        }
    }
}

/// Send one message, print the reply and exit.
pub async fn ask(config: &GemiConfig, message: &str) -> Result<()> {
    let session = build_session(config)?;
    let events = session.subscribe();
    match session.send_message(message).await {
        Submission::Ignored => bail!("nothing to send"),
        Submission::Unavailable { message_id } => {
            print_message(&session, &message_id);
            bail!("inference service unavailable");
        }
        Submission::Streaming(pending) => match stream_reply(&session, pending, events).await? {
            ExchangeOutcome::Finalized { .. } => Ok(()),
            ExchangeOutcome::Cancelled { .. } => bail!("reply cancelled"),
            ExchangeOutcome::Errored { error, .. } => bail!(error),
        },
    }
}

/// Report whether the inference service is reachable with the configured model.
pub async fn status(config: &GemiConfig) -> Result<()> {
    let service = inference::create_service(&config.inference)?;
    println!("Inference service: {}", service.location());
    println!("Model:             {}", config.inference.model);
    if service.check_status().await {
        println!("Status:            ready");
        Ok(())
    } else {
        println!("Status:            unavailable");
        println!();
        println!("Start it with `ollama serve` and make sure the model is pulled:");
        println!("  ollama pull {}", config.inference.model);
        bail!("inference service unavailable")
    }
}

fn print_message(session: &ChatSession, message_id: &str) {
    if let Some(message) = session.messages().into_iter().find(|m| m.id == message_id) {
        println!("gemi> {}", message.content);
    }
}

/// Print chunks as they land until the exchange settles.
async fn stream_reply(
    session: &ChatSession,
    pending: PendingReply,
    mut events: broadcast::Receiver<ChatEvent>,
) -> Result<ExchangeOutcome> {
    let message_id = pending.message_id().to_string();
    let mut printed = 0usize;
    let mut out = std::io::stdout();
    print!("gemi> ");
    out.flush()?;

    let wait = pending.wait();
    tokio::pin!(wait);

    let outcome = loop {
        tokio::select! {
            outcome = &mut wait => break outcome,
            event = events.recv() => match event {
                Ok(ChatEvent::MessageUpdated { id, content }) if id == message_id => {
                    if let Some(delta) = content.get(printed..) {
                        print!("{delta}");
                        out.flush()?;
                    }
                    printed = content.len();
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::debug!(skipped, "display fell behind, catching up at the end");
                }
                _ => {}
            },
            _ = tokio::signal::ctrl_c() => {
                session.cancel();
            }
        }
    };

    match &outcome {
        ExchangeOutcome::Finalized { content, .. } => {
            if let Some(rest) = content.get(printed..) {
                print!("{rest}");
            }
            println!();
        }
        ExchangeOutcome::Cancelled { .. } => println!(" [stopped]"),
        ExchangeOutcome::Errored { error, .. } => {
            if printed > 0 {
                println!();
            }
            println!("{error}");
        }
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn interrupt_at_the_prompt_ends_input() {
        // The writer stays open, so the read alone would wait forever.
        let (_writer, reader) = tokio::io::duplex(64);
        let mut lines = BufReader::new(reader).lines();

        let line = next_input(&mut lines, async { Ok::<(), std::io::Error>(()) }).await.unwrap();
        assert_eq!(line, None);
    }

    #[tokio::test]
    async fn typed_line_is_returned() {
        let mut lines = BufReader::new(&b"how was your day\n"[..]).lines();

        let line = next_input(&mut lines, std::future::pending::<std::io::Result<()>>()).await.unwrap();
        assert_eq!(line.as_deref(), Some("how was your day"));
    }
}
