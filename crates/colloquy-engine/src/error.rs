use colloquy_llm::LlmError;
use colloquy_persist::PersistError;
use thiserror::Error;

/// Errors surfaced by engine operations.
///
/// Cancelling a reply is not an error: it is reported as
/// [`GenerationOutcome::Cancelled`](crate::GenerationOutcome::Cancelled).
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Failed to load conversations: {0}")]
    Load(#[source] PersistError),

    #[error("Failed to persist change: {0}")]
    Persist(#[from] PersistError),

    #[error("Generation failed: {0}")]
    Generation(#[from] LlmError),

    #[error("Thread not found: {0}")]
    ThreadNotFound(String),

    #[error("A reply is already being generated for thread {0}")]
    GenerationInProgress(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, EngineError>;
