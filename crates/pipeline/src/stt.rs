//! HTTP transcription backend
//!
//! Posts the recorded clip to a Whisper-style sidecar service and maps the
//! language it reports onto the supported set.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lead_agent_config::SpeechConfig;
use lead_agent_core::{Language, Transcriber, Transcript};
use serde::Deserialize;

use crate::PipelineError;

/// HTTP STT backend configuration
#[derive(Debug, Clone)]
pub struct HttpSttConfig {
    /// Base URL of the transcription service
    pub url: String,
    pub timeout: Duration,
}

impl Default for HttpSttConfig {
    fn default() -> Self {
        Self::from(&SpeechConfig::default())
    }
}

impl From<&SpeechConfig> for HttpSttConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            url: config.stt_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

/// Response from the transcription service
#[derive(Debug, Deserialize)]
struct SttResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    language: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

/// Supported language for a transcript
///
/// A reported code wins; unknown codes map to English. Without a code the
/// dominant script of the text decides.
pub fn resolve_language(reported: Option<&str>, text: &str) -> Language {
    match reported.map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => Language::from_code_or_default(code),
        None => Language::detect(text).unwrap_or_default(),
    }
}

pub struct WhisperHttpTranscriber {
    config: HttpSttConfig,
    client: reqwest::Client,
}

impl WhisperHttpTranscriber {
    pub fn new(config: HttpSttConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { config, client })
    }

    pub fn config(&self) -> &HttpSttConfig {
        &self.config
    }

    async fn request(
        &self,
        audio: &[u8],
        format: &str,
        hint: Option<Language>,
    ) -> Result<Transcript, PipelineError> {
        if audio.is_empty() {
            return Err(PipelineError::Audio("empty audio".to_string()));
        }

        let url = format!("{}/transcribe", self.config.url);
        let mut request = self
            .client
            .post(&url)
            .header("Content-Type", format!("audio/{}", format))
            .body(audio.to_vec());
        if let Some(language) = hint {
            request = request.header("X-Language", language.code());
        }

        let response = request
            .send()
            .await
            .map_err(|e| PipelineError::Network(format!("HTTP STT request failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNPROCESSABLE_ENTITY {
            return Err(PipelineError::UnsupportedLanguage);
        }
        if !status.is_success() {
            return Err(PipelineError::Transcription(format!(
                "HTTP STT service returned error: {}",
                status
            )));
        }

        let result: SttResponse = response.json().await.map_err(|e| {
            PipelineError::Transcription(format!("Failed to parse STT response: {}", e))
        })?;

        if let Some(error) = &result.error {
            tracing::warn!("STT service returned error: {}", error);
        }

        let text = result.text.trim();
        if text.is_empty() {
            return Err(PipelineError::UnsupportedLanguage);
        }

        Ok(Transcript {
            text: text.to_string(),
            language: resolve_language(result.language.as_deref(), text),
            detected_code: result.language,
        })
    }
}

#[async_trait]
impl Transcriber for WhisperHttpTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        format: &str,
        hint: Option<Language>,
    ) -> lead_agent_core::Result<Transcript> {
        let start = Instant::now();
        let transcript = self.request(audio, format, hint).await?;
        tracing::debug!(
            language = transcript.language.code(),
            detected = ?transcript.detected_code,
            latency_ms = start.elapsed().as_millis() as u64,
            "Transcribed audio"
        );
        Ok(transcript)
    }

    fn name(&self) -> &str {
        "whisper-http"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reported_code_wins() {
        assert_eq!(resolve_language(Some("ta"), "hello"), Language::Tamil);
        assert_eq!(resolve_language(Some("Hindi"), "hello"), Language::Hindi);
    }

    #[test]
    fn test_unknown_code_is_english() {
        assert_eq!(resolve_language(Some("fr"), "bonjour"), Language::English);
        assert_eq!(resolve_language(Some("te"), "నమస్కారం"), Language::English);
    }

    #[test]
    fn test_script_decides_without_code() {
        assert_eq!(resolve_language(None, "என் பெயர் ராஜா"), Language::Tamil);
        assert_eq!(resolve_language(Some(" "), "मेरा नाम राज है"), Language::Hindi);
        assert_eq!(resolve_language(None, "my name is Raj"), Language::English);
        assert_eq!(resolve_language(None, "12345"), Language::English);
    }
}
