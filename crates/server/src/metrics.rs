//! Prometheus metrics
//!
//! The `metrics` facade is fed from request handlers and from
//! [`MetricsTelemetry`]; the exporter renders everything at `/metrics`.

use axum::extract::State;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

use lead_agent_core::{Telemetry, TelemetryEvent, TracingTelemetry};

use crate::state::AppState;

/// Install the global Prometheus recorder
///
/// Returns `None` when a recorder is already installed.
pub fn init_metrics() -> Option<PrometheusHandle> {
    match PrometheusBuilder::new().install_recorder() {
        Ok(handle) => Some(handle),
        Err(e) => {
            tracing::warn!(error = %e, "Prometheus recorder not installed");
            None
        }
    }
}

/// Render the exposition text
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    match &state.metrics {
        Some(handle) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        ),
        None => (
            StatusCode::NOT_FOUND,
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            "metrics disabled\n".to_string(),
        ),
    }
}

pub fn record_request(endpoint: &'static str, status: u16) {
    counter!(
        "lead_agent_requests_total",
        "endpoint" => endpoint,
        "status" => status.to_string()
    )
    .increment(1);
}

pub fn record_stt_latency(ms: u64) {
    histogram!("lead_agent_stt_latency_ms").record(ms as f64);
}

pub fn record_tts_latency(ms: u64) {
    histogram!("lead_agent_tts_latency_ms").record(ms as f64);
}

pub fn record_error(kind: &'static str) {
    counter!("lead_agent_errors_total", "kind" => kind).increment(1);
}

/// Telemetry sink that logs each event and updates the matching metrics
#[derive(Debug, Default, Clone, Copy)]
pub struct MetricsTelemetry {
    log: TracingTelemetry,
}

impl MetricsTelemetry {
    pub fn new() -> Self {
        Self::default()
    }

    fn observe(event: &TelemetryEvent) {
        match event {
            TelemetryEvent::Interaction {
                intent,
                language,
                latency_ms,
                ..
            } => {
                counter!(
                    "lead_agent_interactions_total",
                    "language" => language.clone(),
                    "intent" => intent.clone()
                )
                .increment(1);
                histogram!("lead_agent_interaction_latency_ms").record(*latency_ms as f64);
            }
            TelemetryEvent::Extraction { field, validated, .. } => {
                counter!(
                    "lead_agent_extractions_total",
                    "field" => field.clone(),
                    "validated" => validated.to_string()
                )
                .increment(1);
            }
            TelemetryEvent::LlmCall {
                model,
                prompt_tokens,
                completion_tokens,
                latency_ms,
                cost_usd,
            } => {
                counter!("lead_agent_llm_calls_total", "model" => model.clone()).increment(1);
                counter!("lead_agent_llm_tokens_total", "model" => model.clone())
                    .increment(u64::from(*prompt_tokens) + u64::from(*completion_tokens));
                histogram!("lead_agent_llm_latency_ms", "model" => model.clone())
                    .record(*latency_ms as f64);
                histogram!("lead_agent_llm_cost_usd", "model" => model.clone()).record(*cost_usd);
            }
            TelemetryEvent::LeadCompleted { turns, language, .. } => {
                counter!("lead_agent_leads_completed_total", "language" => language.clone())
                    .increment(1);
                histogram!("lead_agent_turns_to_complete").record(f64::from(*turns));
            }
            TelemetryEvent::RagRetrieval { context_length, .. } => {
                counter!("lead_agent_rag_retrievals_total").increment(1);
                histogram!("lead_agent_rag_context_length").record(*context_length as f64);
            }
            TelemetryEvent::Alert { severity, .. } => {
                counter!("lead_agent_alerts_total", "severity" => severity.as_str()).increment(1);
            }
        }
    }
}

impl Telemetry for MetricsTelemetry {
    fn record(&self, event: TelemetryEvent) {
        Self::observe(&event);
        self.log.record(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_agent_core::Severity;
    use metrics_exporter_prometheus::PrometheusBuilder;

    #[test]
    fn test_events_update_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            let telemetry = MetricsTelemetry::new();
            telemetry.record(TelemetryEvent::interaction(
                "s", 1, "hi", "Hello!", "GREETING", 0.9, "en", 120,
            ));
            telemetry.record(TelemetryEvent::LeadCompleted {
                session_id: "s".into(),
                turns: 4,
                language: "ta".into(),
            });
            telemetry.record(TelemetryEvent::alert(
                Severity::High,
                "Processing failed",
                [("session_id", serde_json::json!("s"))],
            ));
            record_request("chat", 200);
        });

        let text = handle.render();
        assert!(text.contains("lead_agent_interactions_total"));
        assert!(text.contains("intent=\"GREETING\""));
        assert!(text.contains("lead_agent_leads_completed_total{language=\"ta\"} 1"));
        assert!(text.contains("lead_agent_alerts_total{severity=\"HIGH\"} 1"));
        assert!(text.contains("endpoint=\"chat\""));
    }
}
