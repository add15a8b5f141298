use async_trait::async_trait;
use colloquy_types::{Message, Thread};
use futures::future::try_join_all;
use mongodb::Client;

use crate::dbs::mongo::models::{MongoMessage, MongoThread};
use crate::dbs::mongo::repositories::{MongoMessageRepository, MongoThreadRepository};
use crate::error::{PersistError, Result};
use crate::models::{MessagePatch, ThreadPatch};
use crate::trait_client::PersistenceClient;

pub struct MongoPersistenceClient {
    message_repo: MongoMessageRepository,
    thread_repo: MongoThreadRepository,
}

impl MongoPersistenceClient {
    /// Connect to MongoDB and create client
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| PersistError::Connection(e.to_string()))?;

        Ok(Self {
            message_repo: MongoMessageRepository::new(&client, database),
            thread_repo: MongoThreadRepository::new(&client, database),
        })
    }
}

#[async_trait]
impl PersistenceClient for MongoPersistenceClient {
    async fn load_threads(&self, user_id: &str) -> Result<Vec<Thread>> {
        let threads = self.thread_repo.list_threads(user_id).await?;

        // One query per thread, issued concurrently
        let message_lists = try_join_all(
            threads
                .iter()
                .map(|thread| self.message_repo.get_messages(&thread.id)),
        )
        .await?;

        Ok(threads
            .into_iter()
            .zip(message_lists)
            .map(|(thread, messages)| thread.into_thread(messages))
            .collect())
    }

    async fn create_thread(&self, thread: &Thread, user_id: &str) -> Result<()> {
        self.thread_repo
            .insert_thread(&MongoThread::from_thread(thread, user_id))
            .await
    }

    async fn add_message(&self, thread_id: &str, message: &Message) -> Result<()> {
        self.message_repo
            .insert_message(&MongoMessage::from_message(thread_id, message))
            .await?;
        self.thread_repo.touch(thread_id).await
    }

    async fn update_message(&self, message_id: &str, patch: MessagePatch) -> Result<()> {
        self.message_repo.update_message(message_id, patch).await
    }

    async fn delete_messages(&self, message_ids: &[String]) -> Result<()> {
        if message_ids.is_empty() {
            return Ok(());
        }
        self.message_repo.delete_messages(message_ids).await
    }

    async fn update_thread(&self, thread_id: &str, patch: ThreadPatch) -> Result<()> {
        self.thread_repo.update_thread(thread_id, patch).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.message_repo.delete_thread_messages(thread_id).await?;
        self.thread_repo.delete_thread(thread_id).await
    }
}
