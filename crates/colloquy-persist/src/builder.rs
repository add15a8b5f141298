use std::sync::Arc;

use crate::error::{PersistError, Result};
use crate::noop::NoopPersistenceClient;
use crate::trait_client::PersistenceClient;

pub const DEFAULT_DATABASE: &str = "colloquy";

/// Picks a backend from configuration: MongoDB when a URI is set, otherwise
/// the no-op backend
pub struct PersistClientBuilder {
    mongodb_uri: Option<String>,
    database: String,
}

impl PersistClientBuilder {
    pub fn new() -> Self {
        Self {
            mongodb_uri: None,
            database: DEFAULT_DATABASE.to_string(),
        }
    }

    pub fn mongodb_uri(mut self, uri: impl Into<String>) -> Self {
        self.mongodb_uri = Some(uri.into());
        self
    }

    /// Blank URIs count as unset
    pub fn mongodb_uri_opt(mut self, uri: Option<String>) -> Self {
        self.mongodb_uri = uri.filter(|u| !u.trim().is_empty());
        self
    }

    pub fn database(mut self, db: impl Into<String>) -> Self {
        self.database = db.into();
        self
    }

    pub async fn build(self) -> Result<Arc<dyn PersistenceClient>> {
        let Some(uri) = self.mongodb_uri else {
            tracing::info!("No database configured, conversations will not be persisted");
            return Ok(Arc::new(NoopPersistenceClient::new()));
        };

        Self::connect_mongo(&uri, &self.database).await
    }

    #[cfg(feature = "mongodb")]
    async fn connect_mongo(uri: &str, database: &str) -> Result<Arc<dyn PersistenceClient>> {
        let client = crate::dbs::mongo::MongoPersistenceClient::connect(uri, database).await?;
        tracing::info!(database = %database, "Connected to MongoDB");
        Ok(Arc::new(client))
    }

    #[cfg(not(feature = "mongodb"))]
    async fn connect_mongo(_uri: &str, _database: &str) -> Result<Arc<dyn PersistenceClient>> {
        Err(PersistError::Internal(
            "a MongoDB URI is configured but colloquy-persist was built without the `mongodb` feature"
                .to_string(),
        ))
    }
}

impl Default for PersistClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_without_uri_builds_noop() {
        let client = PersistClientBuilder::new().build().await.unwrap();
        assert!(client.load_threads("anyone").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_blank_uri_is_ignored() {
        let client = PersistClientBuilder::new()
            .mongodb_uri_opt(Some("   ".to_string()))
            .build()
            .await
            .unwrap();
        assert!(client.load_threads("anyone").await.unwrap().is_empty());
    }

    #[cfg(not(feature = "mongodb"))]
    #[tokio::test]
    async fn test_uri_without_feature_is_an_error() {
        let result = PersistClientBuilder::new()
            .mongodb_uri("mongodb://localhost:27017")
            .build()
            .await;
        assert!(matches!(result, Err(PersistError::Internal(_))));
    }
}
