//! Telemetry events emitted around conversation turns

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::traits::Telemetry;

/// Alert severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
            Self::Critical => "CRITICAL",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Structured telemetry event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    Interaction {
        session_id: String,
        turn: u32,
        transcript: String,
        response: String,
        intent: String,
        confidence: f32,
        language: String,
        latency_ms: u64,
    },
    Extraction {
        session_id: String,
        field: String,
        value: Option<String>,
        validated: bool,
    },
    LlmCall {
        model: String,
        prompt_tokens: u32,
        completion_tokens: u32,
        latency_ms: u64,
        cost_usd: f64,
    },
    LeadCompleted {
        session_id: String,
        turns: u32,
        language: String,
    },
    RagRetrieval {
        session_id: String,
        query: String,
        context_length: usize,
    },
    Alert {
        severity: Severity,
        message: String,
        context: Map<String, Value>,
    },
}

impl TelemetryEvent {
    /// Interaction event with transcript and response truncated for logs
    #[allow(clippy::too_many_arguments)]
    pub fn interaction(
        session_id: &str,
        turn: u32,
        transcript: &str,
        response: &str,
        intent: &str,
        confidence: f32,
        language: &str,
        latency_ms: u64,
    ) -> Self {
        Self::Interaction {
            session_id: session_id.to_string(),
            turn,
            transcript: truncate(transcript, 100),
            response: truncate(response, 100),
            intent: intent.to_string(),
            confidence,
            language: language.to_string(),
            latency_ms,
        }
    }

    pub fn extraction(session_id: &str, field: &str, value: Option<&str>, validated: bool) -> Self {
        Self::Extraction {
            session_id: session_id.to_string(),
            field: field.to_string(),
            value: value.map(|v| truncate(v, 50)),
            validated,
        }
    }

    pub fn rag_retrieval(session_id: &str, query: &str, context_length: usize) -> Self {
        Self::RagRetrieval {
            session_id: session_id.to_string(),
            query: truncate(query, 100),
            context_length,
        }
    }

    pub fn alert<I, K>(severity: Severity, message: impl Into<String>, context: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self::Alert {
            severity,
            message: message.into(),
            context: context.into_iter().map(|(k, v)| (k.into(), v)).collect(),
        }
    }

    /// Event name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Interaction { .. } => "interaction",
            Self::Extraction { .. } => "extraction",
            Self::LlmCall { .. } => "llm_call",
            Self::LeadCompleted { .. } => "lead_completed",
            Self::RagRetrieval { .. } => "rag_retrieval",
            Self::Alert { .. } => "alert",
        }
    }

    /// Event fields without the name tag
    pub fn fields(&self) -> Map<String, Value> {
        match serde_json::to_value(self) {
            Ok(Value::Object(mut map)) => {
                map.remove("event");
                map
            }
            _ => Map::new(),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    text.chars().take(max_chars).collect()
}

/// Logs every event as one structured line
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTelemetry;

impl Telemetry for TracingTelemetry {
    fn record(&self, event: TelemetryEvent) {
        let fields = Value::Object(event.fields());
        match &event {
            TelemetryEvent::Alert { severity, .. } => {
                tracing::error!(event = event.name(), severity = %severity, %fields, "alert");
            }
            _ => tracing::info!(event = event.name(), %fields, "telemetry"),
        }
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTelemetry;

impl Telemetry for NoopTelemetry {
    fn record(&self, _event: TelemetryEvent) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_event_names() {
        let e = TelemetryEvent::rag_retrieval("s", "gym", 42);
        assert_eq!(e.name(), "rag_retrieval");
        let fields = e.fields();
        assert_eq!(fields.get("context_length"), Some(&json!(42)));
        assert!(fields.get("event").is_none());
    }

    #[test]
    fn test_interaction_truncates() {
        let long = "x".repeat(500);
        let e = TelemetryEvent::interaction("s", 1, &long, &long, "GREETING", 0.9, "en", 10);
        if let TelemetryEvent::Interaction { transcript, response, .. } = e {
            assert_eq!(transcript.chars().count(), 100);
            assert_eq!(response.chars().count(), 100);
        } else {
            panic!("expected interaction");
        }
    }

    #[test]
    fn test_alert_context() {
        let e = TelemetryEvent::alert(
            Severity::High,
            "Processing failed",
            [("session_id", json!("abc"))],
        );
        let fields = e.fields();
        assert_eq!(fields.get("severity"), Some(&json!("HIGH")));
        assert_eq!(fields["context"]["session_id"], json!("abc"));
    }

    #[test]
    fn test_sinks_do_not_panic() {
        TracingTelemetry.record(TelemetryEvent::rag_retrieval("s", "q", 1));
        NoopTelemetry.record(TelemetryEvent::rag_retrieval("s", "q", 1));
    }
}
