//! Centralized server configuration.
//!
//! This module provides strongly-typed configuration for the server,
//! loaded via the `config` crate from environment variables. Nested keys use
//! `__` as separator, so `LLM__MODEL` sets [`LlmSettings::model`].

use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use support_relay_ai::backend::{DEFAULT_GEMINI_BASE_URL, DEFAULT_GEMINI_MODEL};
use support_relay_ai::LlmBackendConfig;
use support_relay_conversation::{DEFAULT_CONTEXT_WINDOW, OrchestratorConfig};

use crate::app::DEFAULT_MAX_REQUEST_BYTES;

/// Server configuration composed from library configs.
#[derive(Clone, Deserialize)]
pub struct ServerConfig {
    /// API key for the Gemini generation provider. Required.
    pub gemini_api_key: String,

    /// SQLite database connection URL.
    #[serde(default = "default_database_url")]
    pub database_url: String,

    /// Address the HTTP listener binds to.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Largest accepted request body, in bytes.
    #[serde(default = "default_max_request_bytes")]
    pub max_request_bytes: usize,

    /// Generation provider settings.
    #[serde(default)]
    pub llm: LlmSettings,

    /// Conversation settings.
    #[serde(default)]
    pub conversation: ConversationSettings,
}

/// Generation provider settings.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmSettings {
    /// Gemini model name.
    #[serde(default = "default_model")]
    pub model: String,

    /// Base URL of the Generative Language API.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Deadline for a single generation call, in seconds.
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    /// Sampling temperature. Provider default when unset.
    #[serde(default)]
    pub temperature: Option<f32>,

    /// Cap on generated tokens. Provider default when unset.
    #[serde(default)]
    pub max_output_tokens: Option<u32>,
}

/// Conversation settings.
#[derive(Debug, Clone, Deserialize)]
pub struct ConversationSettings {
    /// Number of recent messages included in each prompt.
    #[serde(default = "default_context_window")]
    pub context_window: usize,
}

fn default_database_url() -> String {
    "sqlite://chat_sessions.db?mode=rwc".to_string()
}

fn default_bind_address() -> String {
    "127.0.0.1:5000".to_string()
}

fn default_max_request_bytes() -> usize {
    DEFAULT_MAX_REQUEST_BYTES
}

fn default_model() -> String {
    DEFAULT_GEMINI_MODEL.to_string()
}

fn default_base_url() -> String {
    DEFAULT_GEMINI_BASE_URL.to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_context_window() -> usize {
    DEFAULT_CONTEXT_WINDOW
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            model: default_model(),
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            temperature: None,
            max_output_tokens: None,
        }
    }
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            context_window: default_context_window(),
        }
    }
}

impl fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerConfig")
            .field("gemini_api_key", &"[REDACTED]")
            .field("database_url", &self.database_url)
            .field("bind_address", &self.bind_address)
            .field("max_request_bytes", &self.max_request_bytes)
            .field("llm", &self.llm)
            .field("conversation", &self.conversation)
            .finish()
    }
}

impl ServerConfig {
    /// Loads configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if required configuration is missing or invalid.
    pub fn from_env() -> Result<Self, config::ConfigError> {
        Self::from_source(config::Environment::default())
    }

    fn from_source(environment: config::Environment) -> Result<Self, config::ConfigError> {
        let config: Self = config::Config::builder()
            .add_source(environment.separator("__").try_parsing(true))
            .build()?
            .try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Checks values that deserialize fine but cannot work.
    ///
    /// # Errors
    ///
    /// Returns an error for an empty API key, a zero context window, a zero
    /// body limit or a zero generation timeout.
    pub fn validate(&self) -> Result<(), config::ConfigError> {
        if self.gemini_api_key.trim().is_empty() {
            return Err(config::ConfigError::Message(
                "GEMINI_API_KEY must not be empty".to_string(),
            ));
        }
        if self.conversation.context_window == 0 {
            return Err(config::ConfigError::Message(
                "CONVERSATION__CONTEXT_WINDOW must be at least 1".to_string(),
            ));
        }
        if self.max_request_bytes == 0 {
            return Err(config::ConfigError::Message(
                "MAX_REQUEST_BYTES must be at least 1".to_string(),
            ));
        }
        if self.llm.timeout_seconds == 0 {
            return Err(config::ConfigError::Message(
                "LLM__TIMEOUT_SECONDS must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Returns the generation call deadline.
    #[must_use]
    pub fn generation_timeout(&self) -> Duration {
        Duration::from_secs(self.llm.timeout_seconds)
    }

    /// Builds the Gemini backend configuration.
    #[must_use]
    pub fn llm_backend_config(&self) -> LlmBackendConfig {
        LlmBackendConfig::gemini(self.gemini_api_key.clone(), self.llm.model.clone())
            .with_base_url(self.llm.base_url.clone())
            .with_request_timeout(self.generation_timeout())
    }

    /// Builds the orchestrator configuration.
    #[must_use]
    pub fn orchestrator_config(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            context_window: self.conversation.context_window,
            generation_timeout: self.generation_timeout(),
            temperature: self.llm.temperature,
            max_output_tokens: self.llm.max_output_tokens,
        }
    }
}
