// Anthropic Messages API client

use async_trait::async_trait;
use colloquy_types::{Message, Role};
use futures::StreamExt;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use crate::buffer_utils::parse_sse_stream;
use crate::config::AnthropicConfig;
use crate::error::{LlmError, Result};
use crate::streaming::{AnthropicSseParser, ErrorPayload, SnapshotAssembler};
use crate::traits::{ChatClient, ChatRequest, SnapshotStream};

/// Anthropic client (HTTP direct, no SDK)
pub struct AnthropicClient {
    http_client: reqwest::Client,
    base_url: String,
    max_tokens: u32,
}

impl AnthropicClient {
    /// Create new client with API key and default settings
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(AnthropicConfig::new(api_key))
    }

    pub fn from_config(config: AnthropicConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(
            HeaderName::from_static("x-api-key"),
            HeaderValue::from_str(&config.api_key)
                .map_err(|_| LlmError::Config("Invalid API key format".to_string()))?,
        );
        headers.insert(
            HeaderName::from_static("anthropic-version"),
            HeaderValue::from_str(&config.api_version)
                .map_err(|_| LlmError::Config("Invalid API version".to_string()))?,
        );

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(proxy) = &config.proxy {
            let proxy = reqwest::Proxy::all(proxy.url())
                .map_err(|e| LlmError::Config(format!("Invalid proxy: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let http_client = builder
            .build()
            .map_err(|e| LlmError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_tokens: config.max_tokens,
        })
    }

    fn messages_url(&self) -> String {
        format!("{}/v1/messages", self.base_url)
    }

    fn build_request(&self, request: &ChatRequest, stream: bool) -> MessagesRequest {
        MessagesRequest {
            model: request.model.clone(),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            system: request.system_prompt().to_string(),
            messages: request
                .messages
                .iter()
                .filter_map(InputMessage::from_message)
                .collect(),
            stream,
        }
    }

    /// Turn a non-2xx response into `LlmError::Api`
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ApiErrorBody>(&body)
            .map(|b| b.error.message)
            .unwrap_or(body);

        tracing::warn!(status = status.as_u16(), "Anthropic API error: {}", message);
        Err(LlmError::Api {
            status: status.as_u16(),
            message,
        })
    }
}

#[async_trait]
impl ChatClient for AnthropicClient {
    async fn generate(&self, request: ChatRequest) -> Result<Message> {
        let payload = self.build_request(&request, false);

        let response = self
            .http_client
            .post(self.messages_url())
            .json(&payload)
            .send()
            .await?;
        let response = Self::check_status(response).await?;

        let raw: MessagesResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        let text = raw
            .content
            .iter()
            .filter_map(|block| match block {
                ResponseContent::Text { text } => Some(text.as_str()),
                ResponseContent::Other => None,
            })
            .collect::<Vec<_>>()
            .join("");

        if text.is_empty() {
            return Err(LlmError::Parse("response contained no text".to_string()));
        }

        Ok(Message::assistant(raw.id, text))
    }

    async fn generate_stream(
        &self,
        request: ChatRequest,
        cancel: CancellationToken,
    ) -> Result<SnapshotStream> {
        if cancel.is_cancelled() {
            return Err(LlmError::Aborted);
        }

        let payload = self.build_request(&request, true);
        tracing::debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            "Opening message stream"
        );

        let send = self
            .http_client
            .post(self.messages_url())
            .json(&payload)
            .send();

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LlmError::Aborted),
            response = send => response?,
        };
        // A failed response still has a body to read
        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(LlmError::Aborted),
            checked = Self::check_status(response) => checked?,
        };

        let mut events = parse_sse_stream(response.bytes_stream(), AnthropicSseParser, cancel.clone());

        Ok(Box::pin(async_stream::stream! {
            let mut assembler = SnapshotAssembler::new();
            let mut failed = false;

            while let Some(event) = events.next().await {
                let snapshot = match event.and_then(|e| assembler.apply(e)) {
                    Ok(snapshot) => snapshot,
                    Err(e) => {
                        failed = true;
                        yield Err(e);
                        break;
                    }
                };

                if let Some(snapshot) = snapshot {
                    if cancel.is_cancelled() {
                        failed = true;
                        yield Err(LlmError::Aborted);
                        break;
                    }
                    yield Ok(snapshot);
                }

                if assembler.is_finished() {
                    break;
                }
            }

            if !failed && !assembler.is_finished() {
                if cancel.is_cancelled() {
                    yield Err(LlmError::Aborted);
                } else {
                    yield Err(LlmError::Stream(
                        "stream ended before message_stop".to_string(),
                    ));
                }
            }
        }))
    }
}

// ============================================================================
// WIRE TYPES
// ============================================================================

#[derive(Debug, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    system: String,
    messages: Vec<InputMessage>,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    stream: bool,
}

#[derive(Debug, Serialize)]
struct InputMessage {
    role: &'static str,
    content: String,
}

impl InputMessage {
    /// System-role entries never go into the message list
    fn from_message(message: &Message) -> Option<Self> {
        match message.role {
            Role::System => None,
            Role::User | Role::Assistant => Some(Self {
                role: message.role.as_str(),
                content: message.content.clone(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    id: String,
    content: Vec<ResponseContent>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ResponseContent {
    Text {
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ErrorPayload,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_messages_are_filtered() {
        let client = AnthropicClient::new("test-key").unwrap();
        let request = ChatRequest::new(
            "claude-3-opus-20240229",
            vec![
                Message::system("ignored"),
                Message::user("hello"),
                Message::assistant("a1", "hi"),
            ],
        );

        let payload = serde_json::to_value(client.build_request(&request, true)).unwrap();
        let messages = payload["messages"].as_array().unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0]["role"], "user");
        assert_eq!(messages[1]["role"], "assistant");
        assert_eq!(payload["stream"], true);
        assert_eq!(payload["max_tokens"], 4096);
        assert!(payload["system"].as_str().unwrap().contains("markdown"));
    }

    #[test]
    fn test_non_streaming_payload_omits_stream_flag() {
        let client = AnthropicClient::new("test-key").unwrap();
        let request = ChatRequest::new("m", vec![Message::user("q")])
            .with_system("be brief")
            .with_max_tokens(20);

        let payload = serde_json::to_value(client.build_request(&request, false)).unwrap();
        assert!(payload.get("stream").is_none());
        assert_eq!(payload["system"], "be brief");
        assert_eq!(payload["max_tokens"], 20);
    }
}
