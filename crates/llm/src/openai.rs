//! OpenAI-compatible chat completions backend

use std::time::Instant;

use async_trait::async_trait;
use lead_agent_core::{
    FinishReason, GenerateRequest, GenerateResponse, LanguageModel, Message, TokenUsage,
};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::backend::{with_retry, LlmConfig};
use crate::LlmError;

/// Backend for `/v1/chat/completions` style APIs
#[derive(Clone)]
pub struct OpenAiBackend {
    client: Client,
    config: LlmConfig,
}

impl OpenAiBackend {
    pub fn new(config: LlmConfig) -> Result<Self, LlmError> {
        if config.api_key.is_none() {
            return Err(LlmError::Configuration(
                "API key required for OpenAI-compatible backend".to_string(),
            ));
        }
        let client = config.http_client()?;
        Ok(Self { client, config })
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/v1{}", self.config.endpoint, path)
    }

    async fn execute_request(&self, request: &ChatRequest) -> Result<ChatResponse, LlmError> {
        let mut builder = self.client.post(self.api_url("/chat/completions")).json(request);
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        let response = builder.send().await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            if status == reqwest::StatusCode::NOT_FOUND {
                return Err(LlmError::ModelNotFound(self.config.model.clone()));
            }
            return Err(LlmError::Api(format!("{}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    async fn chat(&self, request: GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let start = Instant::now();
        let body = ChatRequest {
            model: self.config.model.clone(),
            messages: request.messages.iter().map(ChatMessage::from).collect(),
            temperature: request.temperature.unwrap_or(self.config.temperature),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
        };

        let result = with_retry(self.config.max_retries, self.config.initial_backoff, || {
            self.execute_request(&body)
        })
        .await?;

        let choice = result
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("response has no choices".to_string()))?;

        let usage = result
            .usage
            .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens))
            .unwrap_or_default();
        tracing::debug!(
            model = %self.config.model,
            tokens = usage.total_tokens,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Chat completion finished"
        );

        Ok(GenerateResponse {
            text: choice.message.content.trim().to_string(),
            finish_reason: match choice.finish_reason.as_deref() {
                Some("length") => FinishReason::Length,
                Some("content_filter") => FinishReason::ContentFilter,
                _ => FinishReason::Stop,
            },
            cost_usd: self.config.cost_usd(&usage),
            usage: Some(usage),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiBackend {
    async fn generate(&self, request: GenerateRequest) -> lead_agent_core::Result<GenerateResponse> {
        Ok(self.chat(request).await?)
    }

    async fn is_available(&self) -> bool {
        let mut builder = self.client.get(self.api_url("/models"));
        if let Some(key) = &self.config.api_key {
            builder = builder.bearer_auth(key);
        }
        builder
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

impl From<&Message> for ChatMessage {
    fn from(msg: &Message) -> Self {
        Self {
            role: msg.role.to_string(),
            content: msg.content.clone(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{http::HeaderMap, routing::post, Json, Router};

    #[test]
    fn test_requires_api_key() {
        let config = LlmConfig {
            api_key: None,
            ..Default::default()
        };
        assert!(matches!(
            OpenAiBackend::new(config),
            Err(LlmError::Configuration(_))
        ));
    }

    #[test]
    fn test_response_parsing() {
        let json = r#"{
            "choices": [{"message": {"role": "assistant", "content": "Hello!"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 12, "completion_tokens": 3, "total_tokens": 15}
        }"#;
        let parsed: ChatResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.choices[0].message.content, "Hello!");
        assert_eq!(parsed.usage.unwrap().prompt_tokens, 12);
    }

    #[tokio::test]
    async fn test_chat_completion_with_cost() {
        let app = Router::new().route(
            "/v1/chat/completions",
            post(|headers: HeaderMap, Json(body): Json<serde_json::Value>| async move {
                assert_eq!(
                    headers.get("authorization").and_then(|v| v.to_str().ok()),
                    Some("Bearer sk-test")
                );
                assert_eq!(body["model"], serde_json::json!("gpt-4o-mini"));
                Json(serde_json::json!({
                    "choices": [{"message": {"role": "assistant", "content": "SERVICE_INQUIRY"}, "finish_reason": "stop"}],
                    "usage": {"prompt_tokens": 1000, "completion_tokens": 1000}
                }))
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let backend = OpenAiBackend::new(LlmConfig {
            endpoint: format!("http://{}", addr),
            model: "gpt-4o-mini".to_string(),
            api_key: Some("sk-test".to_string()),
            prompt_cost_per_1k: 0.00015,
            completion_cost_per_1k: 0.0006,
            ..Default::default()
        })
        .unwrap();

        let response = backend
            .generate(GenerateRequest::from_user("what do you offer"))
            .await
            .unwrap();
        assert_eq!(response.text, "SERVICE_INQUIRY");
        assert!((response.cost_usd - 0.00075).abs() < 1e-12);
    }
}
