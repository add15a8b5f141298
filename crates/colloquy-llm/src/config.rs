// Configuration layer for creating the inference client

use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::anthropic::AnthropicClient;
use crate::error::{LlmError, Result};
use crate::traits::ChatClient;

pub const ANTHROPIC_API_BASE: &str = "https://api.anthropic.com";
pub const ANTHROPIC_API_VERSION: &str = "2023-06-01";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

/// Optional outbound HTTP proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    pub host: String,
    pub port: u16,
}

impl ProxyConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn url(&self) -> String {
        if self.host.contains("://") {
            format!("{}:{}", self.host, self.port)
        } else {
            format!("http://{}:{}", self.host, self.port)
        }
    }
}

/// Configuration for the Anthropic provider
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    pub api_key: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_api_version")]
    pub api_version: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub proxy: Option<ProxyConfig>,
}

fn default_base_url() -> String {
    ANTHROPIC_API_BASE.to_string()
}

fn default_api_version() -> String {
    ANTHROPIC_API_VERSION.to_string()
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

impl AnthropicConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: default_base_url(),
            api_version: default_api_version(),
            max_tokens: DEFAULT_MAX_TOKENS,
            proxy: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(LlmError::Config("API key is empty".to_string()));
        }
        if self.max_tokens == 0 {
            return Err(LlmError::Config("max_tokens must be positive".to_string()));
        }
        Ok(())
    }
}

/// Factory for creating inference clients from configuration
pub struct ClientFactory;

impl ClientFactory {
    pub fn create_client(config: AnthropicConfig) -> Result<Arc<dyn ChatClient>> {
        config.validate()?;
        let client = AnthropicClient::from_config(config)?;
        Ok(Arc::new(client))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AnthropicConfig::new("test-key");
        assert_eq!(config.base_url, "https://api.anthropic.com");
        assert_eq!(config.api_version, "2023-06-01");
        assert_eq!(config.max_tokens, 4096);
        assert!(config.proxy.is_none());
    }

    #[test]
    fn test_missing_fields_use_defaults() {
        let config: AnthropicConfig = serde_json::from_str(r#"{"api_key":"k"}"#).unwrap();
        assert_eq!(config.base_url, ANTHROPIC_API_BASE);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = ClientFactory::create_client(AnthropicConfig::new("  ")).err().unwrap();
        assert!(matches!(err, LlmError::Config(_)));
    }

    #[test]
    fn test_proxy_url() {
        assert_eq!(ProxyConfig::new("localhost", 8080).url(), "http://localhost:8080");
        assert_eq!(
            ProxyConfig::new("https://proxy.internal", 3128).url(),
            "https://proxy.internal:3128"
        );
    }

    #[test]
    fn test_factory_builds_client() {
        let client = ClientFactory::create_client(
            AnthropicConfig::new("test-key").with_proxy(ProxyConfig::new("127.0.0.1", 3128)),
        );
        assert!(client.is_ok());
    }
}
