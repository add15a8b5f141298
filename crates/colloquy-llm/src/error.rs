use thiserror::Error;

/// Failures of the inference client.
///
/// `Aborted` is not a failure in the usual sense: it is the signal a stream
/// produces when its cancellation token fires, and callers are expected to
/// treat it as a clean stop.
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("Generation aborted")]
    Aborted,

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Anthropic API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Provider error ({kind}): {message}")]
    Provider { kind: String, message: String },

    #[error("Failed to parse response: {0}")]
    Parse(String),

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl LlmError {
    /// True when the error is the cancellation signal rather than a failure
    pub fn is_abort(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

impl From<serde_json::Error> for LlmError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, LlmError>;
