use async_trait::async_trait;
use colloquy_types::{Message, Thread};

use crate::error::Result;
use crate::models::{MessagePatch, ThreadPatch};
use crate::trait_client::PersistenceClient;

/// Backend used when no store is configured: accepts every write, loads nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopPersistenceClient;

impl NoopPersistenceClient {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PersistenceClient for NoopPersistenceClient {
    async fn load_threads(&self, _user_id: &str) -> Result<Vec<Thread>> {
        Ok(Vec::new())
    }

    async fn create_thread(&self, _thread: &Thread, _user_id: &str) -> Result<()> {
        Ok(())
    }

    async fn add_message(&self, _thread_id: &str, _message: &Message) -> Result<()> {
        Ok(())
    }

    async fn update_message(&self, _message_id: &str, _patch: MessagePatch) -> Result<()> {
        Ok(())
    }

    async fn delete_messages(&self, _message_ids: &[String]) -> Result<()> {
        Ok(())
    }

    async fn update_thread(&self, _thread_id: &str, _patch: ThreadPatch) -> Result<()> {
        Ok(())
    }

    async fn delete_thread(&self, _thread_id: &str) -> Result<()> {
        Ok(())
    }
}
