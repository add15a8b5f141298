use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::message::Message;

/// Title given to every thread until the topic summary replaces it
pub const DEFAULT_THREAD_TITLE: &str = "New Chat";

/// A conversation: an ordered, append-only (except for suffix truncation)
/// sequence of messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thread {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Thread {
    /// Empty thread with a fresh id and the default title
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: crate::new_id(),
            title: DEFAULT_THREAD_TITLE.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Bump the last-update timestamp
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn position_of(&self, message_id: &str) -> Option<usize> {
        self.messages.iter().position(|m| m.id == message_id)
    }

    pub fn message(&self, message_id: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.id == message_id)
    }

    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Number of messages still flagged as partial
    pub fn partial_messages(&self) -> usize {
        self.messages.iter().filter(|m| m.partial).count()
    }
}

impl Default for Thread {
    fn default() -> Self {
        Self::new()
    }
}
