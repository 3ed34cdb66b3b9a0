//! Ordered chat messages plus the id of the message a streaming task may write.
//!
//! Writes to an AI message go through the owner check: once ownership is released
//! (completion, error, cancellation or preemption), further writes for that id are
//! rejected and leave the transcript untouched.

use super::types::ChatMessage;

#[derive(Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    owner: Option<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn get(&self, id: &str) -> Option<&ChatMessage> {
        self.messages.iter().find(|m| m.id == id)
    }

    pub fn push(&mut self, message: ChatMessage) {
        self.messages.push(message);
    }

    /// Hand write access for `id` to a streaming task, replacing any previous owner.
    pub fn claim(&mut self, id: &str) {
        self.owner = Some(id.to_string());
    }

    pub fn is_owned_by(&self, id: &str) -> bool {
        self.owner.as_deref() == Some(id)
    }

    /// Revoke write access for `id`. Returns false if `id` was not the owner.
    pub fn release(&mut self, id: &str) -> bool {
        if self.is_owned_by(id) {
            self.owner = None;
            true
        } else {
            false
        }
    }

    /// Replace the content of an owned message. Returns false if the write was rejected.
    pub fn replace_content(&mut self, id: &str, content: &str) -> bool {
        if !self.is_owned_by(id) {
            return false;
        }
        match self.messages.iter_mut().find(|m| m.id == id) {
            Some(message) => {
                message.content.clear();
                message.content.push_str(content);
                true
            }
            None => false,
        }
    }

    /// Write the final content, release ownership and return the settled message.
    pub fn finalize(&mut self, id: &str, content: String, is_error: bool) -> Option<ChatMessage> {
        if !self.is_owned_by(id) {
            return None;
        }
        self.owner = None;
        let message = self.messages.iter_mut().find(|m| m.id == id)?;
        message.content = content;
        message.is_error = is_error;
        Some(message.clone())
    }

    pub fn clear(&mut self) {
        self.messages.clear();
        self.owner = None;
    }
}
