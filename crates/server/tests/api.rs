//! Router tests against in-memory storage and stub speech services
//!
//! The stub transcriber treats the clip bytes as the spoken text, so a test
//! controls the transcript by choosing what it base64-encodes.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use lead_agent_agent::{
    create_classifier, ConversationService, ResponseGenerator, TurnOrchestrator, TurnRequest,
};
use lead_agent_config::{AgentConfig, ClassifierKind, MessageCatalog, Settings};
use lead_agent_core::{
    Error, GenerateRequest, GenerateResponse, Language, LanguageModel, NoopTelemetry, Result,
    Synthesizer, TokenUsage, Transcriber, Transcript,
};
use lead_agent_persistence::{AudioStore, InMemoryConversationStore};
use lead_agent_pipeline::{encode_pcm16, inspect_wav, SpeechServices};
use lead_agent_rag::{KnowledgeLoader, KnowledgeRetriever};
use lead_agent_server::{create_router, AppState, SessionManager};

struct StubLlm {
    available: bool,
}

#[async_trait]
impl LanguageModel for StubLlm {
    async fn generate(&self, _request: GenerateRequest) -> Result<GenerateResponse> {
        Ok(GenerateResponse::text("Thanks! Could you share a bit more?")
            .with_usage(TokenUsage::new(30, 8)))
    }

    async fn is_available(&self) -> bool {
        self.available
    }

    fn model_name(&self) -> &str {
        "stub"
    }
}

/// `unsupported` and `broken` clips fail; anything else is its own transcript
struct EchoTranscriber;

#[async_trait]
impl Transcriber for EchoTranscriber {
    async fn transcribe(
        &self,
        audio: &[u8],
        _format: &str,
        _hint: Option<Language>,
    ) -> Result<Transcript> {
        match audio {
            b"unsupported" => Err(Error::UnsupportedLanguage),
            b"broken" => Err(Error::Transcription("service returned 500".into())),
            _ => {
                let text = String::from_utf8_lossy(audio).trim().to_string();
                Ok(Transcript {
                    language: Language::detect(&text).unwrap_or_default(),
                    text,
                    detected_code: None,
                })
            }
        }
    }

    fn name(&self) -> &str {
        "echo"
    }
}

struct ToneSynthesizer {
    fail: bool,
}

#[async_trait]
impl Synthesizer for ToneSynthesizer {
    async fn synthesize(&self, _text: &str, _language: Language) -> Result<Vec<u8>> {
        if self.fail {
            return Err(Error::Synthesis("tts offline".into()));
        }
        encode_pcm16(&[0i16; 1600], 16000).map_err(Into::into)
    }

    fn name(&self) -> &str {
        "tone"
    }
}

struct TestApp {
    router: Router,
    _audio_dir: TempDir,
}

#[derive(Clone, Copy)]
struct Options {
    llm_available: bool,
    tts_fails: bool,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            llm_available: true,
            tts_fails: false,
        }
    }
}

fn app() -> TestApp {
    app_with(Options::default())
}

fn app_with(options: Options) -> TestApp {
    let audio_dir = TempDir::new().unwrap();
    let llm: Arc<dyn LanguageModel> = Arc::new(StubLlm {
        available: options.llm_available,
    });
    let service = conversation_service(llm.clone());

    let speech = SpeechServices {
        transcriber: Arc::new(EchoTranscriber),
        synthesizer: Arc::new(ToneSynthesizer {
            fail: options.tts_fails,
        }),
    };
    let state = AppState::new(
        Settings::default(),
        service,
        llm,
        speech,
        AudioStore::new(audio_dir.path()),
    );

    TestApp {
        router: create_router(state),
        _audio_dir: audio_dir,
    }
}

fn conversation_service(llm: Arc<dyn LanguageModel>) -> Arc<ConversationService> {
    let knowledge = PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../knowledge");
    let retriever = KnowledgeRetriever::new(KnowledgeLoader::load_path(&knowledge).unwrap());

    let config = AgentConfig {
        classifier: ClassifierKind::Rules,
        ..Default::default()
    };
    let generator =
        ResponseGenerator::from_config(&config, llm.clone(), Arc::new(MessageCatalog::default()));
    let orchestrator = TurnOrchestrator::new(
        create_classifier(&config, llm.clone()),
        Arc::new(retriever),
        generator,
        Arc::new(NoopTelemetry),
    );
    Arc::new(ConversationService::new(
        Arc::new(orchestrator),
        Arc::new(InMemoryConversationStore::new()),
        Arc::new(NoopTelemetry),
    ))
}

async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Option<String>, Vec<u8>) {
    let response = app.router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let session = response
        .headers()
        .get("x-session-id")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec();
    (status, session, body)
}

async fn post_json(app: &TestApp, uri: &str, body: Value) -> (StatusCode, Option<String>, Value) {
    let request = Request::post(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let (status, session, body) = send(app, request).await;
    (status, session, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

async fn get(app: &TestApp, uri: &str) -> (StatusCode, Vec<u8>) {
    let (status, _, body) = send(app, Request::get(uri).body(Body::empty()).unwrap()).await;
    (status, body)
}

async fn get_json(app: &TestApp, uri: &str) -> (StatusCode, Value) {
    let (status, body) = get(app, uri).await;
    (status, serde_json::from_slice(&body).unwrap_or(Value::Null))
}

fn voice_body(spoken: &str, session_id: Option<&str>) -> Value {
    json!({
        "audio": BASE64.encode(spoken.as_bytes()),
        "audio_format": "wav",
        "session_id": session_id,
    })
}

#[tokio::test]
async fn test_health() {
    let app = app();
    let (status, body) = get_json(&app, "/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert!(body["checks"]["knowledge"]["documents"].as_u64().unwrap() > 0);
}

#[tokio::test]
async fn test_ready_reports_llm_down() {
    let app = app_with(Options {
        llm_available: false,
        ..Default::default()
    });
    let (status, body) = get_json(&app, "/ready").await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["checks"]["llm"]["status"], "unreachable");
    assert_eq!(body["checks"]["store"]["status"], "ok");

    let (status, _) = get_json(&app_with(Options::default()), "/ready").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_chat_greeting_assigns_session() {
    let app = app();
    let (status, session, body) = post_json(&app, "/api/chat", json!({ "text": "hello" })).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intent"], "GREETING");
    assert_eq!(body["turn_number"], 1);
    assert_eq!(body["language"], "en");
    assert!(body["response"].as_str().unwrap().contains("Riya"));
    assert_eq!(session.as_deref(), body["session_id"].as_str());
    assert!(body.get("audio").is_none());
}

#[tokio::test]
async fn test_chat_collects_lead_across_turns() {
    let app = app();
    let (_, _, first) = post_json(
        &app,
        "/api/chat",
        json!({ "text": "my name is John Smith", "session_id": "web-1" }),
    )
    .await;
    assert_eq!(first["lead"]["name"], "John Smith");

    let (status, _, second) = post_json(
        &app,
        "/api/chat",
        json!({ "text": "9876543210", "session_id": "web-1" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["turn_number"], 2);
    assert_eq!(second["lead"]["phone"], "9876543210");
    assert_eq!(second["lead_complete"], false);

    let (status, summary) = get_json(&app, "/api/sessions/web-1/lead").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["lead"]["name"], "John Smith");
    assert_eq!(summary["total_turns"], 2);

    let (_, sessions) = get_json(&app, "/api/sessions").await;
    assert_eq!(sessions["count"], 1);
    assert_eq!(sessions["sessions"][0]["turns"], 2);
}

#[tokio::test]
async fn test_chat_rejects_bad_input() {
    let app = app();
    let (status, _, _) = post_json(&app, "/api/chat", json!({ "text": "   " })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, body) =
        post_json(&app, "/api/chat", json!({ "text": "hi", "language": "fr" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("fr"));

    let (status, _, _) = post_json(
        &app,
        "/api/chat",
        json!({ "text": "hi", "session_id": "../../etc" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_voice_turn_stores_both_clips() {
    let app = app();
    let (status, session, body) =
        post_json(&app, "/api/voice", voice_body("hello there", Some("call-7"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(session.as_deref(), Some("call-7"));
    assert_eq!(body["transcript"], "hello there");
    assert_eq!(body["intent"], "GREETING");
    assert_eq!(body["audio_format"], "wav");

    let audio = BASE64.decode(body["audio"].as_str().unwrap()).unwrap();
    assert_eq!(inspect_wav(&audio).unwrap().duration_ms(), 100);

    let (status, turns) = get_json(&app, "/api/sessions/call-7/turns").await;
    assert_eq!(status, StatusCode::OK);
    let turn = &turns["turns"][0];
    let input_key = turn["audio_input_key"].as_str().unwrap();
    let output_key = turn["audio_output_key"].as_str().unwrap();
    assert!(input_key.starts_with("call-7/input_"));
    assert!(output_key.starts_with("call-7/output_"));

    let (status, clip) = get(&app, &format!("/api/audio/{}", input_key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clip, b"hello there");

    let (status, clip) = get(&app, &format!("/api/audio/{}", output_key)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(clip, audio);
}

#[tokio::test]
async fn test_voice_unsupported_language_still_counts() {
    let app = app();
    post_json(&app, "/api/voice", voice_body("hello", Some("call-8"))).await;
    let (status, _, body) =
        post_json(&app, "/api/voice", voice_body("unsupported", Some("call-8"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["turn_number"], 2);
    assert_eq!(body["language"], "en");
    assert_eq!(body["intent"], Value::Null);
    assert_eq!(
        body["response"],
        "Sorry, I don't know that language. I can help you with English, Tamil, or Hindi."
    );
    assert!(body["audio"].is_string());
}

#[tokio::test]
async fn test_voice_errors() {
    let app = app();

    let (status, _, _) = post_json(
        &app,
        "/api/voice",
        json!({ "audio": "***not base64***" }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = post_json(&app, "/api/voice", json!({ "audio": "" })).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _, _) = post_json(&app, "/api/voice", voice_body("broken", Some("call-9"))).await;
    assert_eq!(status, StatusCode::BAD_GATEWAY);

    // Failed transcription leaves no turn behind
    let (status, _) = get_json(&app, "/api/sessions/call-9/turns").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_voice_without_synthesis_keeps_turn() {
    let app = app_with(Options {
        tts_fails: true,
        ..Default::default()
    });
    let (status, _, body) = post_json(&app, "/api/voice", voice_body("hello", Some("call-10"))).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("audio").is_none());

    let (_, turns) = get_json(&app, "/api/sessions/call-10/turns").await;
    assert_eq!(turns["count"], 1);
    assert_eq!(turns["turns"][0]["audio_output_key"], Value::Null);
}

#[tokio::test]
async fn test_delete_session() {
    let app = app();
    post_json(&app, "/api/voice", voice_body("hello", Some("gone-1"))).await;

    let request = Request::delete("/api/sessions/gone-1")
        .body(Body::empty())
        .unwrap();
    let (status, _, _) = send(&app, request).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = get_json(&app, "/api/sessions/gone-1/turns").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (status, _) = get_json(&app, "/api/sessions/gone-1/lead").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    let (_, sessions) = get_json(&app, "/api/sessions").await;
    assert_eq!(sessions["count"], 0);
}

#[tokio::test]
async fn test_eviction_releases_lock_after_running_turn() {
    let service = conversation_service(Arc::new(StubLlm { available: true }));
    let sessions = SessionManager::with_config(10, Duration::ZERO, Duration::from_secs(60));
    sessions.get_or_create(Some("mid-turn")).unwrap();

    let pending = service
        .begin_turn(TurnRequest::new("mid-turn", "hello"))
        .await
        .unwrap();
    tokio::time::sleep(Duration::from_millis(5)).await;

    // evicted while its turn is still running
    assert_eq!(sessions.evict_idle(&service), vec!["mid-turn".to_string()]);
    assert_eq!(service.tracked_sessions(), 1);

    service.commit(pending).await.unwrap();
    assert!(sessions.evict_idle(&service).is_empty());
    assert_eq!(service.tracked_sessions(), 0);
}

#[tokio::test]
async fn test_audio_lookup() {
    let app = app();
    let (status, _) = get(&app, "/api/audio/nobody/input_missing.wav").await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = get(&app, "/api/audio/..%2F..%2Fetc%2Fpasswd").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_metrics_disabled_without_recorder() {
    let app = app();
    let (status, _) = get(&app, "/metrics").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
