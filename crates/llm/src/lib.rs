//! LLM integration for the lead qualification agent
//!
//! Features:
//! - Ollama and OpenAI-compatible chat backends
//! - Retry with exponential backoff for transient failures
//! - Token and cost accounting per call
//! - Prompt construction for classification and replies

pub mod backend;
pub mod factory;
pub mod openai;
pub mod prompt;

pub use backend::{LlmConfig, OllamaBackend};
pub use factory::create_backend;
pub use openai::OpenAiBackend;
pub use prompt::PromptBuilder;

use thiserror::Error;

/// LLM errors
#[derive(Error, Debug)]
pub enum LlmError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Timeout")]
    Timeout,

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl LlmError {
    /// Transient failures worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, LlmError::Network(_) | LlmError::Timeout)
    }
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else {
            LlmError::Network(err.to_string())
        }
    }
}

impl From<LlmError> for lead_agent_core::Error {
    fn from(err: LlmError) -> Self {
        match err {
            LlmError::Timeout => lead_agent_core::Error::Timeout("LLM request".to_string()),
            other => lead_agent_core::Error::Llm(other.to_string()),
        }
    }
}
