use async_trait::async_trait;
use colloquy_types::Message;
use futures::Stream;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::models::DEFAULT_MODEL;

/// System instruction sent with every request that does not carry its own
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant. Always respond in markdown format. \
Use code blocks with appropriate language tags for any code examples, \
like ```javascript ... ``` for JavaScript code.";

/// Lazy, ordered, finite sequence of assistant message snapshots.
///
/// Every item carries the cumulative content so far. Intermediate snapshots
/// are `partial`, the last successful one is not. A cancelled stream ends
/// with `Err(LlmError::Aborted)`.
pub type SnapshotStream = Pin<Box<dyn Stream<Item = Result<Message>> + Send>>;

/// Trait for text generation backends
///
/// Provides a single-shot call and an incremental, cancellable stream.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Non-streaming generation, returns the complete assistant message
    async fn generate(&self, request: ChatRequest) -> Result<Message>;

    /// Streaming generation
    async fn generate_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<SnapshotStream>;
}

#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    /// Falls back to [`DEFAULT_SYSTEM_PROMPT`] when `None`
    pub system: Option<String>,
    pub max_tokens: Option<u32>,
}

impl ChatRequest {
    pub fn new(model: impl Into<String>, messages: Vec<Message>) -> Self {
        Self {
            model: model.into(),
            messages,
            system: None,
            max_tokens: None,
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn with_max_tokens(mut self, tokens: u32) -> Self {
        self.max_tokens = Some(tokens);
        self
    }

    pub fn system_prompt(&self) -> &str {
        self.system.as_deref().unwrap_or(DEFAULT_SYSTEM_PROMPT)
    }
}

impl Default for ChatRequest {
    fn default() -> Self {
        Self::new(DEFAULT_MODEL, Vec::new())
    }
}
