//! Configuration management for the lead qualification agent
//!
//! Supports loading configuration from:
//! - YAML/TOML/JSON files under `config/`
//! - Environment variables (`LEAD_AGENT__` prefix, `__` separator)
//!
//! Canned per-language replies live in [`MessageCatalog`] so that adding a
//! language is a configuration change.

pub mod agent;
pub mod llm;
pub mod messages;
pub mod settings;

pub use agent::{AgentConfig, ClassifierKind, PersonaConfig};
pub use llm::{LlmProvider, LlmSettings};
pub use messages::{MessageCatalog, MessageKind};
pub use settings::{
    load_settings, ObservabilityConfig, PersistenceBackend, PersistenceConfig, RagConfig,
    RuntimeEnvironment, ServerConfig, Settings, SpeechConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration file not found: {0}")]
    FileNotFound(String),

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("Missing required field: {0}")]
    MissingField(String),

    #[error("Invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl ConfigError {
    pub(crate) fn invalid(field: &str, message: impl Into<String>) -> Self {
        ConfigError::InvalidValue {
            field: field.to_string(),
            message: message.into(),
        }
    }
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<serde_yaml::Error> for ConfigError {
    fn from(err: serde_yaml::Error) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl From<ConfigError> for lead_agent_core::Error {
    fn from(err: ConfigError) -> Self {
        lead_agent_core::Error::Config(err.to_string())
    }
}
