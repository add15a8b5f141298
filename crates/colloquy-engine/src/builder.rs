use std::sync::Arc;

use colloquy_llm::{ChatClient, DEFAULT_MODEL};
use colloquy_persist::{NoopPersistenceClient, PersistenceClient};

use crate::auth::{CredentialProvider, LocalSession};
use crate::engine::ConversationEngine;
use crate::error::{EngineError, Result};

/// Builder for constructing a ConversationEngine with optional components
pub struct EngineBuilder {
    persistence: Option<Arc<dyn PersistenceClient>>,
    llm_client: Option<Arc<dyn ChatClient>>,
    credentials: Option<Arc<dyn CredentialProvider>>,
    default_model: String,
    summary_model: Option<String>,
}

impl EngineBuilder {
    pub fn new() -> Self {
        Self {
            persistence: None,
            llm_client: None,
            credentials: None,
            default_model: DEFAULT_MODEL.to_string(),
            summary_model: None,
        }
    }

    /// Set the storage backend. Defaults to the no-op backend.
    pub fn persistence(mut self, client: Arc<dyn PersistenceClient>) -> Self {
        self.persistence = Some(client);
        self
    }

    /// Set the inference client
    pub fn llm_client(mut self, client: Arc<dyn ChatClient>) -> Self {
        self.llm_client = Some(client);
        self
    }

    pub fn credentials(mut self, provider: Arc<dyn CredentialProvider>) -> Self {
        self.credentials = Some(provider);
        self
    }

    /// Model selected at start and after `reset`
    pub fn default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    /// Model used for thread titles. Defaults to the selected model.
    pub fn summary_model(mut self, model: impl Into<String>) -> Self {
        self.summary_model = Some(model.into());
        self
    }

    /// Build the engine. Spawns the persistence writer, so this must run
    /// inside a Tokio runtime.
    pub fn build(self) -> Result<ConversationEngine> {
        let llm_client = self
            .llm_client
            .ok_or_else(|| EngineError::Config("LLM client is required".to_string()))?;

        if tokio::runtime::Handle::try_current().is_err() {
            return Err(EngineError::Config(
                "ConversationEngine must be built inside a Tokio runtime".to_string(),
            ));
        }

        let persistence = self
            .persistence
            .unwrap_or_else(|| Arc::new(NoopPersistenceClient::new()));
        let credentials = self
            .credentials
            .unwrap_or_else(|| Arc::new(LocalSession::new()));

        Ok(ConversationEngine::from_parts(
            persistence,
            llm_client,
            credentials,
            self.default_model,
            self.summary_model,
        ))
    }
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
