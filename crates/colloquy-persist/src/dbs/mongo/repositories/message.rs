use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoMessage;
use crate::error::Result;
use crate::models::MessagePatch;

#[derive(Clone)]
pub struct MongoMessageRepository {
    collection: Collection<MongoMessage>,
}

impl MongoMessageRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("messages");
        Self { collection }
    }

    pub async fn insert_message(&self, message: &MongoMessage) -> Result<()> {
        self.collection.insert_one(message).await?;
        Ok(())
    }

    /// Get all messages for a thread in creation order
    pub async fn get_messages(&self, thread_id: &str) -> Result<Vec<MongoMessage>> {
        let messages = self
            .collection
            .find(doc! { "thread_id": thread_id })
            .sort(doc! { "created_at": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(messages)
    }

    pub async fn update_message(&self, message_id: &str, patch: MessagePatch) -> Result<()> {
        let mut set = Document::new();
        if let Some(content) = patch.content {
            set.insert("content", content);
        }
        if let Some(role) = patch.role {
            set.insert("role", bson::to_bson(&role)?);
        }
        if set.is_empty() {
            return Ok(());
        }

        self.collection
            .update_one(doc! { "_id": message_id }, doc! { "$set": set })
            .await?;
        Ok(())
    }

    pub async fn delete_messages(&self, message_ids: &[String]) -> Result<()> {
        self.collection
            .delete_many(doc! { "_id": { "$in": message_ids.to_vec() } })
            .await?;
        Ok(())
    }

    pub async fn delete_thread_messages(&self, thread_id: &str) -> Result<()> {
        self.collection
            .delete_many(doc! { "thread_id": thread_id })
            .await?;
        Ok(())
    }
}
