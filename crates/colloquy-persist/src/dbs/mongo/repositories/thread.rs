use bson::{doc, Document};
use futures::TryStreamExt;
use mongodb::{Client, Collection};

use crate::dbs::mongo::models::MongoThread;
use crate::error::Result;
use crate::models::ThreadPatch;

#[derive(Clone)]
pub struct MongoThreadRepository {
    collection: Collection<MongoThread>,
}

impl MongoThreadRepository {
    pub fn new(client: &Client, db_name: &str) -> Self {
        let collection = client.database(db_name).collection("threads");
        Self { collection }
    }

    pub async fn insert_thread(&self, thread: &MongoThread) -> Result<()> {
        self.collection.insert_one(thread).await?;
        Ok(())
    }

    /// List threads for a user, most recently updated first
    pub async fn list_threads(&self, user_id: &str) -> Result<Vec<MongoThread>> {
        let threads = self
            .collection
            .find(doc! { "user_id": user_id })
            .sort(doc! { "updated_at": -1 })
            .await?
            .try_collect()
            .await?;
        Ok(threads)
    }

    pub async fn touch(&self, thread_id: &str) -> Result<()> {
        let filter = doc! { "_id": thread_id };
        let update = doc! { "$set": { "updated_at": bson::DateTime::now() } };
        self.collection.update_one(filter, update).await?;
        Ok(())
    }

    pub async fn update_thread(&self, thread_id: &str, patch: ThreadPatch) -> Result<()> {
        let mut set = Document::new();
        if let Some(title) = patch.title {
            set.insert("title", title);
        }
        if let Some(updated_at) = patch.updated_at {
            set.insert("updated_at", bson::DateTime::from_chrono(updated_at));
        }
        if set.is_empty() {
            return Ok(());
        }

        self.collection
            .update_one(doc! { "_id": thread_id }, doc! { "$set": set })
            .await?;
        Ok(())
    }

    pub async fn delete_thread(&self, thread_id: &str) -> Result<()> {
        self.collection.delete_one(doc! { "_id": thread_id }).await?;
        Ok(())
    }
}
