use colloquy::{AnthropicConfig, ProxyConfig};
use config::builder::DefaultState;
use config::{Config as ConfigLoader, ConfigBuilder, ConfigError, File, FileFormat};
use serde::Deserialize;
use std::path::Path;

const DEFAULT_CONFIG: &str = include_str!("../config/default.toml");

/// Environment variables that override single settings
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("LLM_MODEL", "llm.model"),
    ("LLM_SUMMARY_MODEL", "llm.summary_model"),
    ("LLM_MAX_TOKENS", "llm.max_tokens"),
    ("LLM_BASE_URL", "llm.base_url"),
    ("MONGODB_DATABASE", "mongodb.database"),
    ("LOG_LEVEL", "logging.level"),
    ("LOG_FORMAT", "logging.format"),
    ("SESSION_USER_ID", "session.user_id"),
];

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub llm: LlmConfig,
    pub mongodb: MongoDbConfig,
    pub logging: LoggingConfig,
    #[serde(default)]
    pub session: SessionConfig,

    // Secrets (from ENV only)
    #[serde(skip)]
    pub anthropic_api_key: String,
    #[serde(skip)]
    pub mongodb_uri: Option<String>,
    #[serde(skip)]
    pub proxy: Option<ProxyConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LlmConfig {
    pub model: String,
    /// Model used to title threads; the selected model when unset
    #[serde(default)]
    pub summary_model: Option<String>,
    pub max_tokens: u32,
    pub base_url: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoDbConfig {
    pub database: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SessionConfig {
    /// Sign in as this user at startup
    #[serde(default)]
    pub user_id: Option<String>,
}

impl Config {
    /// Load configuration from TOML files and environment variables
    ///
    /// Hierarchy (weakest to strongest):
    /// 1. built-in `config/default.toml`
    /// 2. config/{ENV}.toml (if present)
    /// 3. Environment variables (LLM_, MONGODB_, LOG_, SESSION_ prefixes)
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("ENV").unwrap_or_else(|_| "dev".to_string());
        Self::load_with(&env, |key| std::env::var(key).ok())
    }

    /// Same as [`Config::load`] with an explicit environment lookup
    pub fn load_with<F>(env: &str, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let builder = ConfigLoader::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::with_name(&format!("config/{}", env)).required(false));
        let builder = apply_env_overrides(builder, &lookup)?;

        let mut cfg: Config = builder.build()?.try_deserialize()?;
        cfg.apply_secrets(&lookup)?;
        Ok(cfg)
    }

    /// Load config from a specific path (useful for testing)
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        ConfigLoader::builder()
            .add_source(File::from_str(DEFAULT_CONFIG, FileFormat::Toml))
            .add_source(File::from(path.as_ref()))
            .build()?
            .try_deserialize()
    }

    fn apply_secrets<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        self.anthropic_api_key = lookup("ANTHROPIC_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                ConfigError::Message("ANTHROPIC_API_KEY environment variable is required".to_string())
            })?;

        self.mongodb_uri = lookup("MONGODB_URI").filter(|uri| !uri.trim().is_empty());

        self.proxy = match (lookup("HTTP_PROXY_HOST"), lookup("HTTP_PROXY_PORT")) {
            (Some(host), Some(port)) if !host.trim().is_empty() => {
                let port = port.trim().parse::<u16>().map_err(|_| {
                    ConfigError::Message(format!("HTTP_PROXY_PORT is not a valid port: {}", port))
                })?;
                Some(ProxyConfig::new(host.trim(), port))
            }
            (Some(_), None) => {
                return Err(ConfigError::Message(
                    "HTTP_PROXY_HOST is set but HTTP_PROXY_PORT is missing".to_string(),
                ))
            }
            _ => None,
        };

        Ok(())
    }

    pub fn anthropic_config(&self) -> AnthropicConfig {
        let config = AnthropicConfig::new(self.anthropic_api_key.clone())
            .with_base_url(self.llm.base_url.clone())
            .with_max_tokens(self.llm.max_tokens);
        match &self.proxy {
            Some(proxy) => config.with_proxy(proxy.clone()),
            None => config,
        }
    }
}

fn apply_env_overrides<F>(
    mut builder: ConfigBuilder<DefaultState>,
    lookup: &F,
) -> Result<ConfigBuilder<DefaultState>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    for (var, key) in ENV_OVERRIDES {
        if let Some(value) = lookup(var) {
            builder = builder.set_override(*key, value)?;
        }
    }
    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults_with_only_api_key() {
        let config = Config::load_with("test", env(&[("ANTHROPIC_API_KEY", "sk-test")])).unwrap();

        assert_eq!(config.llm.model, colloquy::DEFAULT_MODEL);
        assert_eq!(config.llm.max_tokens, 4096);
        assert!(config.llm.summary_model.is_none());
        assert_eq!(config.mongodb.database, "colloquy");
        assert_eq!(config.logging.format, "pretty");
        assert!(config.mongodb_uri.is_none());
        assert!(config.proxy.is_none());
        assert!(config.session.user_id.is_none());
    }

    #[test]
    fn test_missing_api_key_is_an_error() {
        let err = Config::load_with("test", env(&[])).unwrap_err();
        assert!(err.to_string().contains("ANTHROPIC_API_KEY"));
    }

    #[test]
    fn test_env_overrides() {
        let config = Config::load_with(
            "test",
            env(&[
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("LLM_MODEL", "claude-3-opus-20240229"),
                ("LLM_MAX_TOKENS", "1024"),
                ("LOG_FORMAT", "json"),
                ("SESSION_USER_ID", "alice"),
                ("MONGODB_URI", "mongodb://localhost:27017"),
            ]),
        )
        .unwrap();

        assert_eq!(config.llm.model, "claude-3-opus-20240229");
        assert_eq!(config.llm.max_tokens, 1024);
        assert_eq!(config.logging.format, "json");
        assert_eq!(config.session.user_id.as_deref(), Some("alice"));
        assert_eq!(config.mongodb_uri.as_deref(), Some("mongodb://localhost:27017"));
    }

    #[test]
    fn test_blank_mongodb_uri_is_unset() {
        let config = Config::load_with(
            "test",
            env(&[("ANTHROPIC_API_KEY", "sk-test"), ("MONGODB_URI", "  ")]),
        )
        .unwrap();
        assert!(config.mongodb_uri.is_none());
    }

    #[test]
    fn test_proxy() {
        let config = Config::load_with(
            "test",
            env(&[
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("HTTP_PROXY_HOST", "proxy.local"),
                ("HTTP_PROXY_PORT", "8080"),
            ]),
        )
        .unwrap();

        let llm = config.anthropic_config();
        assert_eq!(llm.proxy.unwrap().url(), "http://proxy.local:8080");
        assert_eq!(llm.api_key, "sk-test");

        let err = Config::load_with(
            "test",
            env(&[
                ("ANTHROPIC_API_KEY", "sk-test"),
                ("HTTP_PROXY_HOST", "proxy.local"),
                ("HTTP_PROXY_PORT", "eighty"),
            ]),
        )
        .unwrap_err();
        assert!(err.to_string().contains("HTTP_PROXY_PORT"));
    }

    #[test]
    fn test_from_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("staging.toml");
        std::fs::write(
            &path,
            r#"
            [llm]
            model = "claude-3-5-sonnet-20240620"
            summary_model = "claude-3-opus-20240229"

            [logging]
            level = "debug"
            format = "json"
            "#,
        )
        .unwrap();

        let config = Config::from_file(&path).unwrap();
        assert_eq!(config.llm.model, "claude-3-5-sonnet-20240620");
        assert_eq!(config.llm.summary_model.as_deref(), Some("claude-3-opus-20240229"));
        assert_eq!(config.llm.max_tokens, 4096);
        assert_eq!(config.logging.level, "debug");
    }
}
