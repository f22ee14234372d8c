//! Speech pipeline for the lead qualification agent
//!
//! Features:
//! - Transcription through an HTTP Whisper-style service
//! - Synthesis through an HTTP TTS service
//! - WAV inspection and encoding

pub mod stt;
pub mod tts;
pub mod wav;

use std::sync::Arc;

use lead_agent_config::SpeechConfig;
use lead_agent_core::{Synthesizer, Transcriber};

pub use stt::{resolve_language, HttpSttConfig, WhisperHttpTranscriber};
pub use tts::{HttpSynthesizer, HttpTtsConfig};
pub use wav::{encode_pcm16, inspect_wav, WavInfo};

/// Pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Audio error: {0}")]
    Audio(String),

    #[error("Transcription error: {0}")]
    Transcription(String),

    #[error("Synthesis error: {0}")]
    Synthesis(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("No supported language detected")]
    UnsupportedLanguage,

    #[error("Configuration error: {0}")]
    Configuration(String),
}

impl From<PipelineError> for lead_agent_core::Error {
    fn from(err: PipelineError) -> Self {
        use lead_agent_core::Error;
        match err {
            PipelineError::UnsupportedLanguage => Error::UnsupportedLanguage,
            PipelineError::Audio(msg) => Error::InvalidInput(msg),
            PipelineError::Transcription(msg) => Error::Transcription(msg),
            PipelineError::Synthesis(msg) => Error::Synthesis(msg),
            PipelineError::Network(msg) => Error::Transcription(msg),
            PipelineError::Configuration(msg) => Error::Config(msg),
        }
    }
}

/// Speech capabilities built from settings
pub struct SpeechServices {
    pub transcriber: Arc<dyn Transcriber>,
    pub synthesizer: Arc<dyn Synthesizer>,
}

/// Create the transcription and synthesis clients
pub fn create_speech(config: &SpeechConfig) -> Result<SpeechServices, PipelineError> {
    let transcriber = WhisperHttpTranscriber::new(HttpSttConfig::from(config))?;
    let synthesizer = HttpSynthesizer::new(HttpTtsConfig::from(config))?;

    tracing::info!(stt = %config.stt_url, tts = %config.tts_url, "Speech services configured");

    Ok(SpeechServices {
        transcriber: Arc::new(transcriber),
        synthesizer: Arc::new(synthesizer),
    })
}
