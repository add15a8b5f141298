//! Prelude module for convenient imports
//!
//! Import everything you need with:
//! ```rust
//! use colloquy::prelude::*;
//! ```

pub use crate::{
    AnthropicConfig, CancellationToken, ChatClient, ChatRequest, ChatState, ClientFactory,
    ConversationEngine, CredentialProvider, EngineError, GenerationOutcome, LocalSession,
    MemoryPersistenceClient, Message, PersistClientBuilder, PersistenceClient, Role, Thread,
};
