//! Lead Agent Server
//!
//! HTTP endpoints for voice and text turns, session inspection, health and
//! Prometheus metrics.

pub mod http;
pub mod metrics;
pub mod session;
pub mod state;

pub use http::create_router;
pub use metrics::{
    init_metrics, record_error, record_request, record_stt_latency, record_tts_latency,
    MetricsTelemetry,
};
pub use session::{Session, SessionInfo, SessionManager};
pub use state::AppState;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lead_agent_agent::AgentError;
use thiserror::Error;

/// Server errors
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("Session error: {0}")]
    Session(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Speech service error: {0}")]
    Speech(String),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Label used for the error counter
    pub fn kind(&self) -> &'static str {
        match self {
            ServerError::Session(_) => "session",
            ServerError::NotFound(_) => "not_found",
            ServerError::InvalidRequest(_) => "invalid_request",
            ServerError::PayloadTooLarge(_) => "payload_too_large",
            ServerError::Speech(_) => "speech",
            ServerError::Persistence(_) => "persistence",
            ServerError::Internal(_) => "internal",
        }
    }
}

impl From<&ServerError> for StatusCode {
    fn from(err: &ServerError) -> Self {
        match err {
            ServerError::Session(_) => StatusCode::SERVICE_UNAVAILABLE,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::PayloadTooLarge(_) => StatusCode::PAYLOAD_TOO_LARGE,
            ServerError::Speech(_) => StatusCode::BAD_GATEWAY,
            ServerError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<ServerError> for StatusCode {
    fn from(err: ServerError) -> Self {
        StatusCode::from(&err)
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = StatusCode::from(&self);
        record_error(self.kind());

        // Storage and internal details stay in the logs
        let message = match &self {
            ServerError::Persistence(_) | ServerError::Internal(_) => {
                tracing::error!(error = %self, "Request failed");
                "Internal server error".to_string()
            }
            _ => {
                tracing::warn!(error = %self, "Request rejected");
                self.to_string()
            }
        };

        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}

impl From<AgentError> for ServerError {
    fn from(err: AgentError) -> Self {
        match err {
            AgentError::InvalidInput(msg) => ServerError::InvalidRequest(msg),
            AgentError::Persistence(msg) => ServerError::Persistence(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}

impl From<lead_agent_persistence::PersistenceError> for ServerError {
    fn from(err: lead_agent_persistence::PersistenceError) -> Self {
        use lead_agent_persistence::PersistenceError;
        match err {
            PersistenceError::InvalidKey(msg) => ServerError::InvalidRequest(msg),
            PersistenceError::NotFound(what) => ServerError::NotFound(what),
            other => ServerError::Persistence(other.to_string()),
        }
    }
}

impl From<lead_agent_core::Error> for ServerError {
    fn from(err: lead_agent_core::Error) -> Self {
        use lead_agent_core::Error;
        match err {
            Error::InvalidInput(msg) => ServerError::InvalidRequest(msg),
            Error::Persistence(msg) => ServerError::Persistence(msg),
            Error::Transcription(msg) | Error::Synthesis(msg) => ServerError::Speech(msg),
            other => ServerError::Internal(other.to_string()),
        }
    }
}
