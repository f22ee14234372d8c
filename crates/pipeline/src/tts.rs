//! HTTP synthesis backend

use std::time::{Duration, Instant};

use async_trait::async_trait;
use lead_agent_config::SpeechConfig;
use lead_agent_core::{Language, Synthesizer};
use serde::Serialize;

use crate::wav::inspect_wav;
use crate::PipelineError;

#[derive(Debug, Clone)]
pub struct HttpTtsConfig {
    /// Base URL of the synthesis service
    pub url: String,
    pub timeout: Duration,
    pub sample_rate: u32,
}

impl Default for HttpTtsConfig {
    fn default() -> Self {
        Self::from(&SpeechConfig::default())
    }
}

impl From<&SpeechConfig> for HttpTtsConfig {
    fn from(config: &SpeechConfig) -> Self {
        Self {
            url: config.tts_url.trim_end_matches('/').to_string(),
            timeout: Duration::from_millis(config.timeout_ms),
            sample_rate: config.sample_rate,
        }
    }
}

#[derive(Debug, Serialize)]
struct TtsRequest<'a> {
    text: &'a str,
    language: &'a str,
    sample_rate: u32,
}

/// Synthesizer backed by a TTS service returning WAV bytes
pub struct HttpSynthesizer {
    config: HttpTtsConfig,
    client: reqwest::Client,
}

impl HttpSynthesizer {
    pub fn new(config: HttpTtsConfig) -> Result<Self, PipelineError> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                PipelineError::Configuration(format!("Failed to create HTTP client: {}", e))
            })?;
        Ok(Self { config, client })
    }

    async fn request(&self, text: &str, language: Language) -> Result<Vec<u8>, PipelineError> {
        if text.trim().is_empty() {
            return Err(PipelineError::Synthesis("empty text".to_string()));
        }

        let url = format!("{}/synthesize", self.config.url);
        let response = self
            .client
            .post(&url)
            .json(&TtsRequest {
                text,
                language: language.code(),
                sample_rate: self.config.sample_rate,
            })
            .send()
            .await
            .map_err(|e| PipelineError::Synthesis(format!("HTTP TTS request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(PipelineError::Synthesis(format!(
                "HTTP TTS service returned error: {}",
                response.status()
            )));
        }

        let audio = response
            .bytes()
            .await
            .map_err(|e| PipelineError::Synthesis(format!("Failed to read TTS audio: {}", e)))?
            .to_vec();

        let info = inspect_wav(&audio)
            .map_err(|e| PipelineError::Synthesis(format!("TTS service returned {}", e)))?;
        tracing::debug!(
            language = language.code(),
            duration_ms = info.duration_ms(),
            sample_rate = info.sample_rate,
            "Synthesized reply"
        );

        Ok(audio)
    }
}

#[async_trait]
impl Synthesizer for HttpSynthesizer {
    async fn synthesize(&self, text: &str, language: Language) -> lead_agent_core::Result<Vec<u8>> {
        let start = Instant::now();
        let audio = self.request(text, language).await?;
        tracing::trace!(latency_ms = start.elapsed().as_millis() as u64, "TTS call");
        Ok(audio)
    }

    fn name(&self) -> &str {
        "http-tts"
    }
}
