//! LLM client module for API interactions.
//!
//! Talks to any service exposing an OpenAI-compatible `/chat/completions`
//! endpoint with server-sent event streaming.

mod openai;
mod provider;
mod sse;

pub use openai::OpenAiProvider;
pub use provider::{LlmProvider, ProviderError, ProviderResult};
pub use sse::SseDecoder;

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::LlmConfigFile;
use crate::error::ConfigError;
use crate::message::Message;

/// Default API base URL when neither the environment nor the config file sets one.
pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";

/// Default model identifier.
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Environment variable holding the API key.
pub const ENV_API_KEY: &str = "OPENAI_API_KEY";

/// Environment variable holding the API base URL.
pub const ENV_BASE_URL: &str = "OPENAI_BASE_URL";

/// Environment variable holding the model identifier.
pub const ENV_MODEL: &str = "MODEL";

/// Chat message for API requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

impl From<&Message> for ChatMessage {
    fn from(message: &Message) -> Self {
        Self::new(message.role.as_str(), message.content.clone())
    }
}

/// Request body for chat completions.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// Events sent during streaming.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A chunk of text was received.
    Token(String),
    /// Stream completed successfully.
    Done,
    /// An error occurred.
    Error(ProviderError),
}

/// LLM client configuration.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_base: String,
    pub api_key: String,
    pub model: String,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub connect_timeout: Option<Duration>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            api_key: String::new(),
            model: DEFAULT_MODEL.to_string(),
            temperature: None,
            max_tokens: None,
            connect_timeout: None,
        }
    }
}

impl LlmConfig {
    /// Check if the client is configured with an API key.
    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Load from environment variables, with file config as fallback.
    pub fn from_env_and_config(file_config: Option<&LlmConfigFile>) -> Self {
        Self::from_sources(file_config, |name| std::env::var(name).ok())
    }

    /// Merge the file config with values looked up through `env`.
    ///
    /// Empty environment values are treated as unset.
    pub fn from_sources(
        file_config: Option<&LlmConfigFile>,
        env: impl Fn(&str) -> Option<String>,
    ) -> Self {
        let mut config = Self::default();

        if let Some(fc) = file_config {
            config.api_base = fc.api_base.clone();
            if let Some(ref key) = fc.api_key {
                config.api_key = key.clone();
            }
            config.model = fc.model.clone();
            config.temperature = fc.temperature;
            config.max_tokens = fc.max_tokens;
        }

        let env = |name: &str| env(name).filter(|value| !value.trim().is_empty());

        if let Some(key) = env(ENV_API_KEY) {
            config.api_key = key;
        }

        if let Some(base) = env(ENV_BASE_URL) {
            config.api_base = base;
        }

        if let Some(model) = env(ENV_MODEL) {
            config.model = model;
        }

        config
    }

    /// Check that a client can be built from this config.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential);
        }

        if self.model.trim().is_empty() {
            return Err(ConfigError::MissingModel);
        }

        let invalid = |reason: String| ConfigError::InvalidBaseUrl {
            url: self.api_base.clone(),
            reason,
        };
        let url = reqwest::Url::parse(&self.api_base).map_err(|e| invalid(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(invalid(format!("unsupported scheme {:?}", url.scheme())));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults_without_sources() {
        let config = LlmConfig::from_sources(None, env_of(&[]));
        assert_eq!(config.api_base, DEFAULT_API_BASE);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(!config.is_configured());
    }

    #[test]
    fn test_env_overrides_file() {
        let file = LlmConfigFile {
            api_base: "http://localhost:8080/v1".to_string(),
            api_key: Some("file-key".to_string()),
            model: "file-model".to_string(),
            temperature: Some(0.2),
            max_tokens: Some(256),
        };
        let config = LlmConfig::from_sources(
            Some(&file),
            env_of(&[(ENV_API_KEY, "env-key"), (ENV_MODEL, "env-model")]),
        );
        assert_eq!(config.api_key, "env-key");
        assert_eq!(config.model, "env-model");
        assert_eq!(config.api_base, "http://localhost:8080/v1");
        assert_eq!(config.temperature, Some(0.2));
        assert_eq!(config.max_tokens, Some(256));
    }

    #[test]
    fn test_empty_env_values_are_ignored() {
        let file = LlmConfigFile {
            api_key: Some("file-key".to_string()),
            ..LlmConfigFile::default()
        };
        let config = LlmConfig::from_sources(
            Some(&file),
            env_of(&[(ENV_API_KEY, ""), (ENV_BASE_URL, "  ")]),
        );
        assert_eq!(config.api_key, "file-key");
        assert_eq!(config.api_base, DEFAULT_API_BASE);
    }

    #[test]
    fn test_validate_requires_credential() {
        let config = LlmConfig::default();
        assert_eq!(config.validate(), Err(ConfigError::MissingCredential));
    }

    #[test]
    fn test_validate_rejects_bad_base_url() {
        let config = LlmConfig {
            api_key: "key".to_string(),
            api_base: "not a url".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));

        let config = LlmConfig {
            api_key: "key".to_string(),
            api_base: "ftp://example.com".to_string(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn test_validate_requires_model() {
        let config = LlmConfig {
            api_key: "key".to_string(),
            model: " ".to_string(),
            ..LlmConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::MissingModel));
    }

    #[test]
    fn test_validate_accepts_complete_config() {
        let config = LlmConfig {
            api_key: "key".to_string(),
            ..LlmConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_chat_message_from_message() {
        let wire = ChatMessage::from(&Message::assistant("Hi"));
        assert_eq!(wire, ChatMessage::new("assistant", "Hi"));
    }
}
