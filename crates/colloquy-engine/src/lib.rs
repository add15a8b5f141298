pub mod auth;
pub mod builder;
mod chat;
pub mod engine;
pub mod error;
pub mod export;
pub mod generation;
pub mod state;
mod summary;
pub mod writer;

pub use auth::{resolve_user_id, CredentialProvider, LocalSession, User, DEFAULT_USER_ID};
pub use builder::EngineBuilder;
pub use engine::ConversationEngine;
pub use error::{EngineError, Result};
pub use export::ThreadExport;
pub use generation::GenerationOutcome;
pub use state::ChatState;
pub use summary::SUMMARY_INSTRUCTION;
pub use writer::Pending;
