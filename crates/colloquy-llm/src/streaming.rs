use colloquy_types::{new_id, Message};
use serde::{Deserialize, Serialize};

use crate::buffer_utils::SseLineParser;
use crate::error::{LlmError, Result};

/// Server-sent events of the Anthropic Messages streaming API
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AnthropicStreamEvent {
    MessageStart {
        message: MessageStartPayload,
    },
    ContentBlockStart {
        index: usize,
        content_block: serde_json::Value,
    },
    ContentBlockDelta {
        index: usize,
        delta: ContentDelta,
    },
    ContentBlockStop {
        index: usize,
    },
    MessageDelta {
        delta: MessageDeltaPayload,
    },
    MessageStop,
    Ping,
    Error {
        error: ErrorPayload,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageStartPayload {
    pub id: String,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentDelta {
    TextDelta {
        text: String,
    },
    InputJsonDelta {
        partial_json: String,
    },
    ThinkingDelta {
        thinking: String,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageDeltaPayload {
    #[serde(default)]
    pub stop_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorPayload {
    #[serde(rename = "type")]
    pub error_type: String,
    pub message: String,
}

/// Parses `data:` payloads into [`AnthropicStreamEvent`]s
#[derive(Debug, Default, Clone, Copy)]
pub struct AnthropicSseParser;

impl SseLineParser for AnthropicSseParser {
    type Event = AnthropicStreamEvent;

    fn parse_data_line(&self, data: &str) -> Result<Option<AnthropicStreamEvent>> {
        if data.is_empty() {
            return Ok(None);
        }
        let event = serde_json::from_str(data)?;
        Ok(Some(event))
    }
}

/// Folds stream events into cumulative assistant snapshots.
///
/// The message id is taken from `message_start`. If text arrives first a
/// local id is generated once and kept for the rest of the stream, so every
/// snapshot of one generation carries the same id.
#[derive(Debug, Default)]
pub struct SnapshotAssembler {
    message_id: Option<String>,
    content: String,
    finished: bool,
}

impl SnapshotAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply one event, returning a snapshot when the visible state changed
    pub fn apply(&mut self, event: AnthropicStreamEvent) -> Result<Option<Message>> {
        if self.finished {
            return Ok(None);
        }

        match event {
            AnthropicStreamEvent::MessageStart { message } => {
                if self.message_id.is_none() {
                    self.message_id = Some(message.id);
                }
                Ok(None)
            }
            AnthropicStreamEvent::ContentBlockDelta {
                delta: ContentDelta::TextDelta { text },
                ..
            } => {
                if text.is_empty() {
                    return Ok(None);
                }
                self.content.push_str(&text);
                Ok(Some(self.snapshot(true)))
            }
            AnthropicStreamEvent::MessageStop => {
                self.finished = true;
                Ok(Some(self.snapshot(false)))
            }
            AnthropicStreamEvent::Error { error } => Err(LlmError::Provider {
                kind: error.error_type,
                message: error.message,
            }),
            _ => Ok(None),
        }
    }

    pub fn is_finished(&self) -> bool {
        self.finished
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    fn snapshot(&mut self, partial: bool) -> Message {
        let id = self.message_id.get_or_insert_with(new_id).clone();
        Message::snapshot(id, self.content.clone(), partial)
    }
}
