//! Capability traits for pluggable backends
//!
//! The conversation core only talks to the outside world through these:
//! - [`LanguageModel`] for classification and response generation
//! - [`Transcriber`] and [`Synthesizer`] for speech
//! - [`ConversationStore`] for turn persistence
//! - [`Telemetry`] for fire-and-forget events

mod llm;
mod speech;
mod store;
mod telemetry;

pub use llm::LanguageModel;
pub use speech::{Synthesizer, Transcriber, Transcript};
pub use store::ConversationStore;
pub use telemetry::Telemetry;
