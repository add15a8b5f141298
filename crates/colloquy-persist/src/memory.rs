use async_trait::async_trait;
use chrono::{DateTime, Utc};
use colloquy_types::{Message, Thread};
use std::collections::HashMap;
use tokio::sync::Mutex;

use crate::error::{PersistError, Result};
use crate::models::{MessagePatch, ThreadPatch};
use crate::trait_client::PersistenceClient;

#[derive(Debug, Clone)]
struct StoredThread {
    user_id: String,
    title: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    thread_id: String,
    message: Message,
}

#[derive(Debug, Default)]
struct Store {
    threads: HashMap<String, StoredThread>,
    // Insertion order breaks ties between equal timestamps
    messages: Vec<StoredMessage>,
}

/// Process-local backend with the same ordering rules as the durable one.
///
/// Writes against a thread that was never created fail with
/// `PersistError::ThreadNotFound`, which makes out-of-order writes visible.
#[derive(Debug, Default)]
pub struct MemoryPersistenceClient {
    store: Mutex<Store>,
}

impl MemoryPersistenceClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn thread_count(&self) -> usize {
        self.store.lock().await.threads.len()
    }

    pub async fn message_count(&self) -> usize {
        self.store.lock().await.messages.len()
    }
}

#[async_trait]
impl PersistenceClient for MemoryPersistenceClient {
    async fn load_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let store = self.store.lock().await;

        let mut threads: Vec<Thread> = store
            .threads
            .iter()
            .filter(|(_, t)| t.user_id == user_id)
            .map(|(id, t)| {
                let mut messages: Vec<Message> = store
                    .messages
                    .iter()
                    .filter(|m| &m.thread_id == id)
                    .map(|m| m.message.clone())
                    .collect();
                messages.sort_by_key(|m| m.created_at);

                Thread {
                    id: id.clone(),
                    title: t.title.clone(),
                    messages,
                    created_at: t.created_at,
                    updated_at: t.updated_at,
                }
            })
            .collect();

        threads.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(threads)
    }

    async fn create_thread(&self, thread: &Thread, user_id: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.threads.insert(
            thread.id.clone(),
            StoredThread {
                user_id: user_id.to_string(),
                title: thread.title.clone(),
                created_at: thread.created_at,
                updated_at: thread.updated_at,
            },
        );
        Ok(())
    }

    async fn add_message(&self, thread_id: &str, message: &Message) -> Result<()> {
        let mut store = self.store.lock().await;
        let thread = store
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;
        thread.updated_at = Utc::now();

        store.messages.push(StoredMessage {
            thread_id: thread_id.to_string(),
            message: Message {
                partial: false,
                ..message.clone()
            },
        });
        Ok(())
    }

    async fn update_message(&self, message_id: &str, patch: MessagePatch) -> Result<()> {
        let mut store = self.store.lock().await;
        if let Some(stored) = store
            .messages
            .iter_mut()
            .find(|m| m.message.id == message_id)
        {
            if let Some(content) = patch.content {
                stored.message.content = content;
            }
            if let Some(role) = patch.role {
                stored.message.role = role;
            }
        }
        Ok(())
    }

    async fn delete_messages(&self, message_ids: &[String]) -> Result<()> {
        if message_ids.is_empty() {
            return Ok(());
        }
        let mut store = self.store.lock().await;
        store.messages.retain(|m| !message_ids.contains(&m.message.id));
        Ok(())
    }

    async fn update_thread(&self, thread_id: &str, patch: ThreadPatch) -> Result<()> {
        let mut store = self.store.lock().await;
        let thread = store
            .threads
            .get_mut(thread_id)
            .ok_or_else(|| PersistError::ThreadNotFound(thread_id.to_string()))?;

        if let Some(title) = patch.title {
            thread.title = title;
        }
        if let Some(updated_at) = patch.updated_at {
            thread.updated_at = updated_at;
        }
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        let mut store = self.store.lock().await;
        store.messages.retain(|m| m.thread_id != thread_id);
        store.threads.remove(thread_id);
        Ok(())
    }
}
