//! Speech capability traits

use crate::{Language, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Transcription result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    /// Supported language the text was mapped to
    pub language: Language,
    /// Language code as reported by the recognizer, if any
    pub detected_code: Option<String>,
}

/// Speech-to-text capability
#[async_trait]
pub trait Transcriber: Send + Sync + 'static {
    /// Transcribe one recorded utterance
    ///
    /// Fails with [`crate::Error::UnsupportedLanguage`] when no supported
    /// language could be recognised in the audio.
    async fn transcribe(&self, audio: &[u8], format: &str, hint: Option<Language>)
        -> Result<Transcript>;

    /// Get provider name
    fn name(&self) -> &str;
}

/// Text-to-speech capability
#[async_trait]
pub trait Synthesizer: Send + Sync + 'static {
    /// Synthesize text into encoded audio (WAV)
    async fn synthesize(&self, text: &str, language: Language) -> Result<Vec<u8>>;

    /// Get provider name
    fn name(&self) -> &str;
}
