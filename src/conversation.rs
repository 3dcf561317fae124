use serde::{Deserialize, Serialize};

use crate::constants::HISTORY_LIMIT;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Client-side conversation history. Never holds the system instruction; the
/// relay adds that on every request.
#[derive(Debug, Clone)]
pub struct Conversation {
    turns: Vec<ChatMessage>,
    limit: usize,
}

impl Default for Conversation {
    fn default() -> Self {
        Self::with_limit(HISTORY_LIMIT)
    }
}

impl Conversation {
    pub fn with_limit(limit: usize) -> Self {
        Self {
            turns: Vec::new(),
            limit,
        }
    }

    pub fn push_user(&mut self, content: impl Into<String>) {
        self.turns.push(ChatMessage::user(content));
    }

    /// Records a completed assistant reply, then drops the oldest turns so at
    /// most `limit` remain.
    pub fn complete_turn(&mut self, reply: impl Into<String>) {
        self.turns.push(ChatMessage::assistant(reply));
        self.settle();
    }

    /// Drops the oldest turns so at most `limit` remain. Also called when an
    /// exchange fails, so retries against a dead relay cannot grow the history.
    pub fn settle(&mut self) {
        if self.turns.len() > self.limit {
            let excess = self.turns.len() - self.limit;
            self.turns.drain(..excess);
        }
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }
}
