//! Time-bounded model calls with usage capture

use std::time::{Duration, Instant};

use lead_agent_core::{GenerateRequest, GenerateResponse, LanguageModel, TelemetryEvent};

use crate::AgentError;

/// Usage and timing of one completed model call
#[derive(Debug, Clone, PartialEq)]
pub struct LlmCallStats {
    pub model: String,
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub latency_ms: u64,
    pub cost_usd: f64,
}

impl LlmCallStats {
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens + self.completion_tokens
    }

    pub fn to_event(&self) -> TelemetryEvent {
        TelemetryEvent::LlmCall {
            model: self.model.clone(),
            prompt_tokens: self.prompt_tokens,
            completion_tokens: self.completion_tokens,
            latency_ms: self.latency_ms,
            cost_usd: self.cost_usd,
        }
    }
}

/// Run `request` against `llm`, failing with `AgentError::Timeout` after `timeout`
pub(crate) async fn generate_bounded(
    llm: &dyn LanguageModel,
    request: GenerateRequest,
    timeout: Duration,
) -> Result<(GenerateResponse, LlmCallStats), AgentError> {
    let start = Instant::now();
    let response = match tokio::time::timeout(timeout, llm.generate(request)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(AgentError::Timeout(format!(
                "{} did not answer within {}ms",
                llm.model_name(),
                timeout.as_millis()
            )))
        }
    };

    let usage = response.usage.unwrap_or_default();
    let stats = LlmCallStats {
        model: llm.model_name().to_string(),
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        latency_ms: start.elapsed().as_millis() as u64,
        cost_usd: response.cost_usd,
    };
    Ok((response, stats))
}
