pub mod anthropic;
pub mod buffer_utils;
pub mod config;
pub mod error;
pub mod models;
pub mod streaming;
pub mod traits;

pub use anthropic::AnthropicClient;
pub use config::{AnthropicConfig, ClientFactory, ProxyConfig};
pub use error::{LlmError, Result};
pub use models::{find_model, ModelInfo, AVAILABLE_MODELS, DEFAULT_MODEL};
pub use streaming::{AnthropicStreamEvent, SnapshotAssembler};
pub use traits::{ChatClient, ChatRequest, SnapshotStream, DEFAULT_SYSTEM_PROMPT};

pub use colloquy_types::{Message, Role};
