//! Test doubles for the language model and telemetry

use std::collections::VecDeque;
use std::time::Duration;

use async_trait::async_trait;
use lead_agent_core::{
    Error, GenerateRequest, GenerateResponse, LanguageModel, Result, Telemetry, TelemetryEvent,
    TokenUsage,
};
use parking_lot::Mutex;

/// Replays queued replies in order and records every request
pub(crate) struct ScriptedLlm {
    replies: Mutex<VecDeque<Result<GenerateResponse>>>,
    requests: Mutex<Vec<GenerateRequest>>,
    delay: Option<Duration>,
}

impl ScriptedLlm {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn reply(self, text: &str) -> Self {
        let response = GenerateResponse::text(text).with_usage(TokenUsage::new(20, 5));
        self.replies.lock().push_back(Ok(response));
        self
    }

    pub fn fail(self, err: Error) -> Self {
        self.replies.lock().push_back(Err(err));
        self
    }

    pub fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl LanguageModel for ScriptedLlm {
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        self.requests.lock().push(request);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies
            .lock()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Llm("script exhausted".to_string())))
    }

    async fn is_available(&self) -> bool {
        true
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Telemetry sink that keeps every event
#[derive(Default)]
pub(crate) struct RecordingTelemetry {
    events: Mutex<Vec<TelemetryEvent>>,
}

impl RecordingTelemetry {
    pub fn events(&self) -> Vec<TelemetryEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events.lock().iter().map(TelemetryEvent::name).collect()
    }
}

impl Telemetry for RecordingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        self.events.lock().push(event);
    }
}
