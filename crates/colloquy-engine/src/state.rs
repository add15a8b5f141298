use chrono::{DateTime, Utc};
use colloquy_types::{Message, Thread};
use std::collections::BTreeSet;

/// Everything the presentation layer renders.
///
/// Observers receive whole `ChatState` values through
/// [`ConversationEngine::subscribe`](crate::ConversationEngine::subscribe), so a
/// half-applied mutation is never visible.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    /// Most recently updated first
    pub threads: Vec<Thread>,
    pub active_thread_id: Option<String>,
    pub selected_model: String,
    /// A bulk load is in progress
    pub loading: bool,
    /// Threads with a reply currently streaming
    pub generating: BTreeSet<String>,
}

impl ChatState {
    pub fn new(selected_model: impl Into<String>) -> Self {
        Self {
            selected_model: selected_model.into(),
            ..Self::default()
        }
    }

    pub fn thread(&self, thread_id: &str) -> Option<&Thread> {
        self.threads.iter().find(|t| t.id == thread_id)
    }

    pub fn active_thread(&self) -> Option<&Thread> {
        self.active_thread_id
            .as_deref()
            .and_then(|id| self.thread(id))
    }

    pub fn is_generating(&self, thread_id: &str) -> bool {
        self.generating.contains(thread_id)
    }

    fn thread_mut(&mut self, thread_id: &str) -> Option<&mut Thread> {
        self.threads.iter_mut().find(|t| t.id == thread_id)
    }

    /// Swap in a freshly loaded collection. The active thread survives if it
    /// is still present, otherwise the first thread becomes active.
    pub(crate) fn replace_threads(&mut self, mut threads: Vec<Thread>) {
        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        for thread in &mut threads {
            thread.messages.sort_by_key(|m| m.created_at);
        }

        let keep_active = self
            .active_thread_id
            .as_deref()
            .is_some_and(|id| threads.iter().any(|t| t.id == id));
        if !keep_active {
            self.active_thread_id = threads.first().map(|t| t.id.clone());
        }
        self.threads = threads;
    }

    pub(crate) fn insert_thread(&mut self, thread: Thread) {
        self.active_thread_id = Some(thread.id.clone());
        self.threads.insert(0, thread);
    }

    /// Returns false when the thread is unknown
    pub(crate) fn append_message(&mut self, thread_id: &str, message: Message) -> bool {
        let Some(thread) = self.thread_mut(thread_id) else {
            return false;
        };

        // Only the tail can still be receiving increments
        for earlier in &mut thread.messages {
            earlier.partial = false;
        }
        thread.messages.push(message);
        thread.touch();
        true
    }

    /// Replace a message wholesale, keeping its id and creation time.
    /// Returns the stored message, or `None` if either id is unknown.
    pub(crate) fn replace_message(
        &mut self,
        thread_id: &str,
        message_id: &str,
        message: Message,
    ) -> Option<Message> {
        let thread = self.thread_mut(thread_id)?;
        let position = thread.position_of(message_id)?;

        let slot = &mut thread.messages[position];
        *slot = Message {
            id: slot.id.clone(),
            created_at: slot.created_at,
            ..message
        };
        let stored = slot.clone();
        thread.touch();
        Some(stored)
    }

    /// Drop every message after `index`, returning the removed ids in order
    pub(crate) fn truncate_after(&mut self, thread_id: &str, index: usize) -> Vec<String> {
        let Some(thread) = self.thread_mut(thread_id) else {
            return Vec::new();
        };
        if index >= thread.messages.len().saturating_sub(1) {
            return Vec::new();
        }

        let removed: Vec<String> = thread
            .messages
            .drain(index + 1..)
            .map(|m| m.id)
            .collect();
        thread.touch();
        removed
    }

    /// Returns the new `updated_at`, or `None` for an unknown thread
    pub(crate) fn rename_thread(&mut self, thread_id: &str, title: &str) -> Option<DateTime<Utc>> {
        let thread = self.thread_mut(thread_id)?;
        thread.title = title.to_string();
        thread.touch();
        Some(thread.updated_at)
    }

    pub(crate) fn remove_thread(&mut self, thread_id: &str) -> bool {
        let before = self.threads.len();
        self.threads.retain(|t| t.id != thread_id);
        if self.threads.len() == before {
            return false;
        }

        if self.active_thread_id.as_deref() == Some(thread_id) {
            self.active_thread_id = self.threads.first().map(|t| t.id.clone());
        }
        self.generating.remove(thread_id);
        true
    }

    pub(crate) fn clear(&mut self, default_model: &str) {
        *self = Self::new(default_model);
    }
}
