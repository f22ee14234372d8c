//! Conversation turn engine for lead qualification
//!
//! Features:
//! - Intent classification (LLM-backed or rule-based)
//! - Ordered lead field extraction (name, phone, company, requirement)
//! - Canned and LLM-composed replies in English, Tamil and Hindi
//! - A per-turn state machine: classify, then retrieve or extract, then reply
//! - Session bookkeeping: language stickiness, turn numbering, persistence
//!   and per-session serialization

pub mod classifier;
pub mod extractor;
pub mod generator;
mod llm_call;
pub mod orchestrator;
pub mod service;

#[cfg(test)]
mod testing;

pub use classifier::{create_classifier, IntentClassifier, LlmIntentClassifier, RuleBasedClassifier};
pub use extractor::{Extraction, FieldExtractor};
pub use generator::{Generated, ResponseGenerator};
pub use llm_call::LlmCallStats;
pub use orchestrator::{TurnInput, TurnOrchestrator, TurnOutcome, TurnStep};
pub use service::{ConversationService, PendingTurn, TurnRequest, TurnResult};

use thiserror::Error;

/// Agent errors
#[derive(Error, Debug, Clone, PartialEq)]
pub enum AgentError {
    /// Classifier output did not name a known intent
    #[error("Classification error: {0}")]
    Classification(String),

    #[error("Generation error: {0}")]
    Generation(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

impl From<lead_agent_core::Error> for AgentError {
    fn from(err: lead_agent_core::Error) -> Self {
        use lead_agent_core::Error;
        match err {
            Error::Timeout(what) => AgentError::Timeout(what),
            Error::Persistence(msg) => AgentError::Persistence(msg),
            Error::InvalidInput(msg) => AgentError::InvalidInput(msg),
            other => AgentError::Generation(other.to_string()),
        }
    }
}

impl From<lead_agent_llm::LlmError> for AgentError {
    fn from(err: lead_agent_llm::LlmError) -> Self {
        AgentError::Generation(err.to_string())
    }
}

impl From<AgentError> for lead_agent_core::Error {
    fn from(err: AgentError) -> Self {
        use lead_agent_core::Error;
        match err {
            AgentError::Timeout(what) => Error::Timeout(what),
            AgentError::Persistence(msg) => Error::Persistence(msg),
            AgentError::InvalidInput(msg) => Error::InvalidInput(msg),
            AgentError::Generation(msg) => Error::Llm(msg),
            AgentError::Classification(msg) => Error::Agent(msg),
        }
    }
}
