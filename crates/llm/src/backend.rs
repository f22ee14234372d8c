//! LLM backend configuration and the Ollama backend

use std::future::Future;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use lead_agent_config::LlmSettings;
use lead_agent_core::{
    FinishReason, GenerateRequest, GenerateResponse, LanguageModel, Message, TokenUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::LlmError;

/// LLM configuration
#[derive(Debug, Clone)]
pub struct LlmConfig {
    /// Model name/ID
    pub model: String,
    /// API endpoint
    pub endpoint: String,
    /// API key (optional)
    pub api_key: Option<String>,
    /// Maximum tokens to generate
    pub max_tokens: u32,
    /// Temperature
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
    /// USD per 1000 prompt tokens
    pub prompt_cost_per_1k: f64,
    /// USD per 1000 completion tokens
    pub completion_cost_per_1k: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self::from(&LlmSettings::default())
    }
}

impl From<&LlmSettings> for LlmConfig {
    fn from(s: &LlmSettings) -> Self {
        Self {
            model: s.model.clone(),
            endpoint: s.endpoint.trim_end_matches('/').to_string(),
            api_key: s.api_key.clone(),
            max_tokens: s.max_tokens,
            temperature: s.temperature,
            timeout: Duration::from_millis(s.timeout_ms),
            max_retries: s.max_retries,
            initial_backoff: Duration::from_millis(s.initial_backoff_ms),
            prompt_cost_per_1k: s.prompt_cost_per_1k,
            completion_cost_per_1k: s.completion_cost_per_1k,
        }
    }
}

impl LlmConfig {
    /// Price of a call with the given usage
    pub fn cost_usd(&self, usage: &TokenUsage) -> f64 {
        f64::from(usage.prompt_tokens) / 1000.0 * self.prompt_cost_per_1k
            + f64::from(usage.completion_tokens) / 1000.0 * self.completion_cost_per_1k
    }

    pub(crate) fn http_client(&self) -> Result<Client, LlmError> {
        Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))
    }
}

/// Run `op` until it succeeds, fails permanently, or retries run out
///
/// The wait between attempts starts at `initial_backoff` and doubles.
pub(crate) async fn with_retry<T, F, Fut>(
    max_retries: u32,
    initial_backoff: Duration,
    mut op: F,
) -> Result<T, LlmError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, LlmError>>,
{
    let mut last_error = None;
    let mut backoff = initial_backoff;

    for attempt in 0..=max_retries {
        if attempt > 0 {
            tracing::warn!(
                "LLM request failed, retrying in {:?} (attempt {}/{})",
                backoff,
                attempt,
                max_retries
            );
            tokio::time::sleep(backoff).await;
            backoff *= 2;
        }

        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() => last_error = Some(e),
            Err(e) => return Err(e),
        }
    }

    Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
}

/// Ollama backend
#[derive(Clone)]
pub struct OllamaBackend {
    client: Client,
    config: LlmConfig,
}

impl OllamaBackend {
    /// Create a new Ollama backend
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api{}", self.config.endpoint, path)
    }

    async fn execute_request(
        &self,
        request: &OllamaChatRequest,
    ) -> Result<OllamaChatResponse, LlmError> {
        let response = self
            .client
            .post(self.api_url("/chat"))
            .json(request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let error = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(LlmError::ModelNotFound(self.config.model.clone()));
            }
            return Err(LlmError::Api(error));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    async fn chat(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let start = Instant::now();
        let body = OllamaChatRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(OllamaMessage::from).collect(),
            stream: false,
            options: Some(OllamaOptions {
                temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
                num_predict: Some(request.max_tokens.unwrap_or(self.config.max_tokens) as i32),
            }),
        };

        let result = with_retry(self.config.max_retries, self.config.initial_backoff, || {
            self.execute_request(&body)
        })
        .await?;

        let usage = TokenUsage::new(
            result.prompt_eval_count.unwrap_or(0),
            result.eval_count.unwrap_or(0),
        );
        tracing::debug!(
            model = %self.config.model,
            tokens = usage.total_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Ollama generation complete"
        );

        Ok(GenerateResponse {
            text: result.message.content.trim().to_string(),
            finish_reason: match result.done_reason.as_deref() {
                Some("length") => FinishReason::Length,
                _ if result.done => FinishReason::Stop,
                _ => FinishReason::Length,
            },
            cost_usd: self.config.cost_usd(&usage),
            usage: Some(usage),
        })
    }
}

#[async_trait]
impl LanguageModel for OllamaBackend {
    async fn generate(&self, request: GenerateRequest) -> lead_agent_core::Result<GenerateResponse> {
        Ok(self.chat(request).await?)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(self.api_url("/tags"))
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// Ollama API types
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<OllamaOptions>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

impl From<&Message> for OllamaMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<i32>,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: OllamaMessage,
    done: bool,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    eval_count: Option<u32>,
    #[serde(default)]
    prompt_eval_count: Option<u32>,
}
