//! Error types shared across crate boundaries

use thiserror::Error;

/// Errors crossing capability trait boundaries
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Error {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Retrieval error: {0}")]
    Rag(String),

    #[error("Agent error: {0}")]
    Agent(String),

    #[error("No supported language could be detected")]
    UnsupportedLanguage,

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure came from the generation backend
    pub fn is_generation_failure(&self) -> bool {
        matches!(self, Error::Llm(_) | Error::Timeout(_))
    }
}

/// Result alias using the core error
pub type Result<T> = std::result::Result<T, Error>;
