//! # Colloquy
//!
//! Client-side conversation state and streaming engine for LLM chat
//! applications.
//!
//! ## Overview
//!
//! Colloquy keeps a user's conversation threads in memory and mirrors every
//! change to a storage backend in the background:
//!
//! - **Optimistic state**: mutations apply immediately and are observable
//!   through a watch channel
//! - **Ordered persistence**: remote writes are applied in the order the
//!   state changed, by a single writer task
//! - **Cancellable streaming**: assistant replies arrive as cumulative
//!   snapshots and can be stopped at any point
//! - **Edit and regenerate**: editing a message truncates what follows and
//!   streams a fresh reply
//! - **Topic titles**: a thread's first message is summarised into its title
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use colloquy::prelude::*;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AnthropicConfig::new(std::env::var("ANTHROPIC_API_KEY")?);
//!     let llm = ClientFactory::create_client(config)?;
//!
//!     let engine = ConversationEngine::builder()
//!         .llm_client(llm)
//!         .persistence(Arc::new(MemoryPersistenceClient::new()))
//!         .build()?;
//!
//!     let user_id = engine.current_user_id();
//!     engine.load_all(&user_id).await?;
//!     let thread = engine.create_thread(&user_id);
//!
//!     if let Some(outcome) = engine.send_message(&thread.id, "Hello!").await? {
//!         if let Some(reply) = outcome.message() {
//!             println!("{}", reply.content);
//!         }
//!     }
//!
//!     engine.flush().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! - **`colloquy-types`**: threads and messages
//! - **`colloquy-llm`**: inference client with cancellable snapshot streaming
//! - **`colloquy-persist`**: storage adapter (no-op, in-memory, MongoDB)
//! - **`colloquy-engine`**: the conversation engine
//!
//! ## License
//!
//! MIT

pub mod prelude;

pub use colloquy_types::{new_id, Message, Role, Thread, DEFAULT_THREAD_TITLE};

pub use colloquy_llm::{
    find_model, AnthropicClient, AnthropicConfig, ChatClient, ChatRequest, ClientFactory,
    LlmError, ModelInfo, ProxyConfig, SnapshotStream, AVAILABLE_MODELS, DEFAULT_MODEL,
};

pub use colloquy_persist::{
    MemoryPersistenceClient, MessagePatch, NoopPersistenceClient, PersistClientBuilder,
    PersistError, PersistenceClient, ThreadPatch,
};

#[cfg(feature = "mongodb")]
pub use colloquy_persist::MongoPersistenceClient;

pub use colloquy_engine::{
    ChatState, ConversationEngine, CredentialProvider, EngineBuilder, EngineError,
    GenerationOutcome, LocalSession, Pending, ThreadExport, User, DEFAULT_USER_ID,
};

pub use tokio_util::sync::CancellationToken;
