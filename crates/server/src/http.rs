//! HTTP Endpoints
//!
//! REST API for voice and text turns plus session inspection.

use std::time::{Duration, Instant};

use axum::{
    extract::{DefaultBodyLimit, Json, Path, State},
    http::{header, HeaderName, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{delete, get, post},
    Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use lead_agent_agent::{TurnRequest, TurnResult};
use lead_agent_core::{Error, Language, LeadRecord};
use lead_agent_persistence::AudioKind;

use crate::metrics::{
    metrics_handler, record_error, record_request, record_stt_latency, record_tts_latency,
};
use crate::session::validate_session_id;
use crate::state::AppState;
use crate::ServerError;

pub const SESSION_HEADER: &str = "x-session-id";

const PROBE_TIMEOUT: Duration = Duration::from_secs(2);

/// Create the application router
pub fn create_router(state: AppState) -> Router {
    let server = &state.settings.server;
    let cors_layer = build_cors_layer(&server.cors_origins, server.cors_enabled);
    // Base64 inflates audio by a third; leave room for the JSON envelope
    let body_limit = server.max_audio_bytes / 3 * 4 + 64 * 1024;
    let timeout = Duration::from_secs(server.timeout_seconds);

    Router::new()
        // Turns
        .route("/api/voice", post(voice))
        .route("/api/chat", post(chat))
        // Sessions
        .route("/api/sessions", get(list_sessions))
        .route("/api/sessions/:id", delete(delete_session))
        .route("/api/sessions/:id/lead", get(get_lead))
        .route("/api/sessions/:id/turns", get(get_turns))
        // Stored clips
        .route("/api/audio/*key", get(get_audio))
        // Health check
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        // Prometheus metrics
        .route("/metrics", get(metrics_handler))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TimeoutLayer::new(timeout))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer)
        .with_state(state)
}

fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    let session_header = HeaderName::from_static(SESSION_HEADER);

    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins");
        return CorsLayer::permissive().expose_headers([session_header]);
    }

    let parsed_origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("Invalid CORS origin: {}", origin);
                None
            })
        })
        .collect();

    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .expose_headers([session_header]);

    if parsed_origins.is_empty() {
        tracing::info!("No valid CORS origins configured, defaulting to localhost:3000");
        return layer.allow_origin(HeaderValue::from_static("http://localhost:3000"));
    }

    tracing::info!("CORS configured with {} origins", parsed_origins.len());
    layer.allow_origin(parsed_origins)
}

/// Voice turn request
#[derive(Debug, Deserialize)]
pub struct VoiceRequest {
    /// Base64 encoded clip
    pub audio: String,
    #[serde(default = "default_audio_format")]
    pub audio_format: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// Language override (code or name)
    #[serde(default)]
    pub language: Option<String>,
}

fn default_audio_format() -> String {
    "wav".to_string()
}

/// Text turn request
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub text: String,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub language: Option<String>,
}

/// Per-phase timings in milliseconds
#[derive(Debug, Default, Serialize)]
pub struct Timings {
    pub stt_ms: u64,
    pub agent_ms: u64,
    pub tts_ms: u64,
    pub total_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct TurnResponse {
    pub session_id: String,
    pub turn_number: u32,
    pub transcript: String,
    pub response: String,
    pub language: &'static str,
    pub intent: Option<&'static str>,
    pub confidence: Option<f32>,
    pub stage: &'static str,
    pub lead: LeadRecord,
    pub lead_complete: bool,
    /// Base64 WAV reply; absent for text turns or when synthesis failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_format: Option<&'static str>,
    pub timings: Timings,
}

impl TurnResponse {
    fn new(result: TurnResult, audio: Option<&[u8]>, timings: Timings) -> Self {
        let record = result.record;
        Self {
            session_id: record.session_id,
            turn_number: record.turn_number,
            transcript: record.transcript,
            response: record.response,
            language: record.language.code(),
            intent: record.intent.map(|i| i.as_str()),
            confidence: record.confidence,
            stage: record.stage.as_str(),
            lead: record.lead,
            lead_complete: result.lead_complete,
            audio: audio.map(|bytes| BASE64.encode(bytes)),
            audio_format: audio.map(|_| "wav"),
            timings,
        }
    }

    fn into_response_with_header(self) -> Result<Response, ServerError> {
        let session = HeaderValue::from_str(&self.session_id)
            .map_err(|e| ServerError::Internal(format!("session header: {}", e)))?;
        let mut response = Json(self).into_response();
        response
            .headers_mut()
            .insert(HeaderName::from_static(SESSION_HEADER), session);
        Ok(response)
    }
}

fn parse_language(code: Option<&str>) -> Result<Option<Language>, ServerError> {
    match code.map(str::trim).filter(|c| !c.is_empty()) {
        None => Ok(None),
        Some(code) => Language::from_str_loose(code)
            .map(Some)
            .ok_or_else(|| ServerError::InvalidRequest(format!("Unsupported language: {}", code))),
    }
}

fn elapsed_ms(since: Instant) -> u64 {
    since.elapsed().as_millis() as u64
}

/// Voice turn: transcribe, run the turn, synthesize the reply
async fn voice(State(state): State<AppState>, Json(request): Json<VoiceRequest>) -> Response {
    let response = process_voice(&state, request).await.into_response();
    record_request("voice", response.status().as_u16());
    response
}

async fn process_voice(state: &AppState, request: VoiceRequest) -> Result<Response, ServerError> {
    let started = Instant::now();
    let language = parse_language(request.language.as_deref())?;

    let audio = BASE64
        .decode(request.audio.trim())
        .map_err(|e| ServerError::InvalidRequest(format!("Invalid base64 audio: {}", e)))?;
    if audio.is_empty() {
        return Err(ServerError::InvalidRequest("Empty audio".to_string()));
    }
    if audio.len() > state.max_audio_bytes() {
        return Err(ServerError::PayloadTooLarge(audio.len()));
    }

    let session = state.sessions.get_or_create(request.session_id.as_deref())?;
    let input_key = state
        .audio
        .save(&session.id, &audio, AudioKind::Input)
        .await?;

    let mut timings = Timings::default();

    let stt_start = Instant::now();
    let transcription = state
        .transcriber
        .transcribe(&audio, &request.audio_format, language)
        .await;
    timings.stt_ms = elapsed_ms(stt_start);
    record_stt_latency(timings.stt_ms);

    let agent_start = Instant::now();
    let mut pending = match transcription {
        Ok(transcript) => {
            tracing::debug!(
                session_id = %session.id,
                language = transcript.language.code(),
                chars = transcript.text.chars().count(),
                "Transcribed"
            );
            let turn = TurnRequest::new(&session.id, transcript.text)
                .with_language(language)
                .with_detected_language(Some(transcript.language))
                .with_audio_input_key(Some(input_key));
            state.service.begin_turn(turn).await?
        }
        Err(Error::UnsupportedLanguage) => {
            state
                .service
                .begin_unsupported(&session.id, Some(input_key))
                .await?
        }
        Err(e) => return Err(e.into()),
    };
    timings.agent_ms = elapsed_ms(agent_start);

    let tts_start = Instant::now();
    let reply_audio = match state
        .synthesizer
        .synthesize(pending.response(), pending.language())
        .await
    {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            // The turn still stands without audio
            tracing::warn!(session_id = %session.id, error = %e, "Synthesis failed");
            record_error("tts");
            None
        }
    };
    timings.tts_ms = elapsed_ms(tts_start);
    record_tts_latency(timings.tts_ms);

    if let Some(bytes) = &reply_audio {
        let key = state
            .audio
            .save(&session.id, bytes, AudioKind::Output)
            .await?;
        pending.set_audio_output_key(key);
    }

    let result = state.service.commit(pending).await?;
    session.record_turn(result.record.turn_number, result.record.language);
    timings.total_ms = elapsed_ms(started);

    TurnResponse::new(result, reply_audio.as_deref(), timings).into_response_with_header()
}

/// Text turn
async fn chat(State(state): State<AppState>, Json(request): Json<ChatRequest>) -> Response {
    let response = process_chat(&state, request).await.into_response();
    record_request("chat", response.status().as_u16());
    response
}

async fn process_chat(state: &AppState, request: ChatRequest) -> Result<Response, ServerError> {
    let started = Instant::now();
    let language = parse_language(request.language.as_deref())?;
    if request.text.trim().is_empty() {
        return Err(ServerError::InvalidRequest("Empty text".to_string()));
    }

    let session = state.sessions.get_or_create(request.session_id.as_deref())?;
    let detected = Language::detect(&request.text);
    let turn = TurnRequest::new(&session.id, request.text)
        .with_language(language)
        .with_detected_language(detected);

    let result = state.service.handle_turn(turn).await?;
    session.record_turn(result.record.turn_number, result.record.language);

    let agent_ms = elapsed_ms(started);
    let timings = Timings {
        agent_ms,
        total_ms: agent_ms,
        ..Default::default()
    };
    TurnResponse::new(result, None, timings).into_response_with_header()
}

/// List live sessions
async fn list_sessions(State(state): State<AppState>) -> Json<serde_json::Value> {
    let sessions = state.sessions.list();
    Json(serde_json::json!({
        "count": sessions.len(),
        "sessions": sessions,
    }))
}

/// Delete a session's history and clips
async fn delete_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, ServerError> {
    validate_session_id(&id)?;
    state.sessions.remove(&id);
    state.service.delete_session(&id).await?;
    state.audio.delete_session(&id).await?;
    tracing::info!(session_id = %id, "Deleted session");
    Ok(StatusCode::NO_CONTENT)
}

/// Lead summary of a session
async fn get_lead(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServerError> {
    validate_session_id(&id)?;
    let summary = state
        .service
        .store()
        .lead_summary(&id)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("session {}", id)))?;
    Ok(Json(summary))
}

/// Turn history of a session
async fn get_turns(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    validate_session_id(&id)?;
    let turns = state.service.store().turns(&id).await?;
    if turns.is_empty() {
        return Err(ServerError::NotFound(format!("session {}", id)));
    }
    Ok(Json(serde_json::json!({
        "session_id": id,
        "count": turns.len(),
        "turns": turns,
    })))
}

/// Stored clip as WAV
async fn get_audio(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Response, ServerError> {
    let key = key.trim_start_matches('/');
    let bytes = state
        .audio
        .get(key)
        .await?
        .ok_or_else(|| ServerError::NotFound(format!("audio {}", key)))?;
    Ok(([(header::CONTENT_TYPE, "audio/wav")], bytes).into_response())
}

async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let documents = state.service.orchestrator().retriever().len();
    let mut checks = serde_json::Map::new();
    checks.insert(
        "knowledge".to_string(),
        serde_json::json!({
            "status": if documents > 0 { "ok" } else { "empty" },
            "documents": documents,
        }),
    );
    checks.insert(
        "sessions".to_string(),
        serde_json::json!({ "status": "ok", "count": state.sessions.count() }),
    );

    (
        StatusCode::OK,
        Json(serde_json::json!({
            "status": "healthy",
            "version": env!("CARGO_PKG_VERSION"),
            "checks": checks,
        })),
    )
}

/// Ready when the language model and the conversation store answer
async fn readiness_check(State(state): State<AppState>) -> (StatusCode, Json<serde_json::Value>) {
    let mut checks = serde_json::Map::new();
    let mut ready = true;

    let llm_status = match tokio::time::timeout(PROBE_TIMEOUT, state.llm.is_available()).await {
        Ok(true) => "ok",
        Ok(false) => {
            ready = false;
            "unreachable"
        }
        Err(_) => {
            ready = false;
            "timeout"
        }
    };
    checks.insert(
        "llm".to_string(),
        serde_json::json!({ "status": llm_status, "model": state.llm.model_name() }),
    );

    let store_status =
        match tokio::time::timeout(PROBE_TIMEOUT, state.service.store().health_check()).await {
            Ok(true) => "ok",
            Ok(false) => {
                ready = false;
                "error"
            }
            Err(_) => {
                ready = false;
                "timeout"
            }
        };
    checks.insert(
        "store".to_string(),
        serde_json::json!({ "status": store_status }),
    );

    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (
        status,
        Json(serde_json::json!({
            "ready": ready,
            "checks": checks,
        })),
    )
}
