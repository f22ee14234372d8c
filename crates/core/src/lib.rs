//! Core traits and types for the lead qualification agent
//!
//! This crate provides foundational types used across all other crates:
//! - Capability traits for pluggable backends (LLM, STT, TTS, storage, telemetry)
//! - The lead record being filled across turns
//! - Intents and the intent to action mapping
//! - Language definitions (English, Tamil, Hindi)
//! - Conversation turn and session summary types
//! - Error types

pub mod conversation;
pub mod error;
pub mod intent;
pub mod language;
pub mod lead;
pub mod llm_types;
pub mod telemetry;
pub mod traits;

pub use conversation::{LeadStatus, LeadSummary, PriorLeadState, SessionStage, TurnRecord};
pub use error::{Error, Result};
pub use intent::{Classification, Intent, NextAction, DEFAULT_CONFIDENCE};
pub use language::{Language, Script};
pub use lead::{is_valid_phone, LeadField, LeadRecord};
pub use llm_types::{FinishReason, GenerateRequest, GenerateResponse, Message, Role, TokenUsage};
pub use telemetry::{NoopTelemetry, Severity, TelemetryEvent, TracingTelemetry};

// Trait re-exports
pub use traits::{
    ConversationStore, LanguageModel, Synthesizer, Telemetry, Transcriber, Transcript,
};
