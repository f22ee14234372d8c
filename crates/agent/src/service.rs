//! Conversation service
//!
//! Wraps the orchestrator with session bookkeeping: loading the prior turn,
//! choosing the language, numbering turns, persisting the turn row and
//! emitting interaction telemetry. Turns on one session run one at a time;
//! different sessions run in parallel.
//!
//! A turn is split into [`ConversationService::begin_turn`] and
//! [`ConversationService::commit`] so callers can attach synthesized audio
//! before the row is written. Dropping a [`PendingTurn`] discards the turn.

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::json;
use tokio::sync::{Mutex, OwnedMutexGuard};

use lead_agent_core::{
    ConversationStore, Language, PriorLeadState, SessionStage, Severity, Telemetry,
    TelemetryEvent, TurnRecord,
};

use crate::orchestrator::{TurnInput, TurnOrchestrator, TurnOutcome};
use crate::AgentError;

/// Inbound utterance for one turn
#[derive(Debug, Clone, Default)]
pub struct TurnRequest {
    pub session_id: String,
    pub transcript: String,
    /// Caller override, wins over everything else
    pub language: Option<Language>,
    /// Language reported by transcription
    pub detected_language: Option<Language>,
    pub audio_input_key: Option<String>,
}

impl TurnRequest {
    pub fn new(session_id: impl Into<String>, transcript: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            transcript: transcript.into(),
            ..Default::default()
        }
    }

    pub fn with_language(mut self, language: Option<Language>) -> Self {
        self.language = language;
        self
    }

    pub fn with_detected_language(mut self, language: Option<Language>) -> Self {
        self.detected_language = language;
        self
    }

    pub fn with_audio_input_key(mut self, key: Option<String>) -> Self {
        self.audio_input_key = key;
        self
    }
}

/// A processed turn that has not been persisted yet
///
/// Holds the session's turn lock until committed or dropped.
pub struct PendingTurn {
    record: TurnRecord,
    reply_language: Language,
    outcome: Option<TurnOutcome>,
    prior_complete: bool,
    started: Instant,
    _guard: OwnedMutexGuard<()>,
}

impl PendingTurn {
    pub fn record(&self) -> &TurnRecord {
        &self.record
    }

    pub fn response(&self) -> &str {
        &self.record.response
    }

    /// Language the response is written in
    pub fn language(&self) -> Language {
        self.reply_language
    }

    /// Orchestrator outcome; `None` for the unsupported-language reply
    pub fn outcome(&self) -> Option<&TurnOutcome> {
        self.outcome.as_ref()
    }

    pub fn set_audio_output_key(&mut self, key: impl Into<String>) {
        self.record.audio_output_key = Some(key.into());
    }
}

/// A persisted turn
#[derive(Debug, Clone)]
pub struct TurnResult {
    pub record: TurnRecord,
    pub lead_complete: bool,
    /// The lead became complete on this turn
    pub newly_completed: bool,
    /// The fallback reply replaced a failed generation
    pub degraded: bool,
    pub context: Option<String>,
}

/// Effective language: override, then the session's, then detected, then English
pub fn resolve_language(
    requested: Option<Language>,
    prior: Option<&PriorLeadState>,
    detected: Option<Language>,
) -> Language {
    requested
        .or_else(|| prior.map(|p| p.language))
        .or(detected)
        .unwrap_or_default()
}

fn persistence(err: lead_agent_core::Error) -> AgentError {
    AgentError::Persistence(err.to_string())
}

pub struct ConversationService {
    orchestrator: Arc<TurnOrchestrator>,
    store: Arc<dyn ConversationStore>,
    telemetry: Arc<dyn Telemetry>,
    latency_alert: Duration,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl ConversationService {
    pub fn new(
        orchestrator: Arc<TurnOrchestrator>,
        store: Arc<dyn ConversationStore>,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            orchestrator,
            store,
            telemetry,
            latency_alert: Duration::from_millis(3000),
            locks: DashMap::new(),
        }
    }

    pub fn with_latency_alert(mut self, threshold: Duration) -> Self {
        self.latency_alert = threshold;
        self
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn orchestrator(&self) -> &TurnOrchestrator {
        &self.orchestrator
    }

    /// Process and persist one turn
    pub async fn handle_turn(&self, request: TurnRequest) -> Result<TurnResult, AgentError> {
        let pending = self.begin_turn(request).await?;
        self.commit(pending).await
    }

    /// Process one turn without persisting it
    pub async fn begin_turn(&self, request: TurnRequest) -> Result<PendingTurn, AgentError> {
        let transcript = request.transcript.trim();
        if transcript.is_empty() {
            return Err(AgentError::InvalidInput("empty transcript".to_string()));
        }

        let started = Instant::now();
        let guard = self.session_lock(&request.session_id).lock_owned().await;
        let prior = self
            .store
            .load_latest(&request.session_id)
            .await
            .map_err(persistence)?;

        let language = resolve_language(request.language, prior.as_ref(), request.detected_language);
        let prior = prior.unwrap_or_default();
        let turn_number = prior.turn_count + 1;

        tracing::debug!(
            session_id = %request.session_id,
            turn = turn_number,
            language = language.code(),
            "Starting turn"
        );

        let outcome = self
            .orchestrator
            .process(TurnInput {
                session_id: request.session_id.clone(),
                transcript: transcript.to_string(),
                language,
                lead: prior.lead.clone(),
                turn_count: prior.turn_count,
            })
            .await;

        let mut record = TurnRecord::new(&request.session_id, turn_number);
        record.transcript = transcript.to_string();
        record.response = outcome.response.clone();
        record.language = language;
        record.intent = Some(outcome.intent());
        record.confidence = Some(outcome.classification.confidence);
        record.lead = outcome.lead.clone();
        record.stage = SessionStage::after_turn(Some(outcome.intent()), &outcome.lead, prior.stage);
        record.audio_input_key = request.audio_input_key;
        record.tokens_used = outcome.tokens_used;
        record.cost_usd = outcome.cost_usd;

        Ok(PendingTurn {
            record,
            reply_language: language,
            outcome: Some(outcome),
            prior_complete: prior.lead.is_complete(),
            started,
            _guard: guard,
        })
    }

    /// Turn answering speech in an unsupported language
    ///
    /// The reply is the fixed English message; the lead is untouched and the
    /// turn still counts. The row keeps the session's language so the next
    /// turn is not switched to English.
    pub async fn begin_unsupported(
        &self,
        session_id: &str,
        audio_input_key: Option<String>,
    ) -> Result<PendingTurn, AgentError> {
        let started = Instant::now();
        let guard = self.session_lock(session_id).lock_owned().await;
        let prior = self
            .store
            .load_latest(session_id)
            .await
            .map_err(persistence)?;
        let session_language = prior.as_ref().map(|p| p.language).unwrap_or_default();
        let prior = prior.unwrap_or_default();

        let mut record = TurnRecord::new(session_id, prior.turn_count + 1);
        record.response = self
            .orchestrator
            .generator()
            .messages()
            .unsupported_language
            .clone();
        record.language = session_language;
        record.lead = prior.lead.clone();
        record.stage = prior.stage;
        record.audio_input_key = audio_input_key;

        tracing::info!(session_id = %session_id, turn = record.turn_number, "Unsupported language");

        Ok(PendingTurn {
            record,
            reply_language: Language::English,
            outcome: None,
            prior_complete: prior.lead.is_complete(),
            started,
            _guard: guard,
        })
    }

    pub async fn record_unsupported(
        &self,
        session_id: &str,
        audio_input_key: Option<String>,
    ) -> Result<TurnResult, AgentError> {
        let pending = self.begin_unsupported(session_id, audio_input_key).await?;
        self.commit(pending).await
    }

    /// Persist a pending turn and emit its telemetry
    pub async fn commit(&self, pending: PendingTurn) -> Result<TurnResult, AgentError> {
        let PendingTurn {
            mut record,
            reply_language: _,
            outcome,
            prior_complete,
            started,
            _guard: guard,
        } = pending;

        let elapsed = started.elapsed();
        record.latency_ms = elapsed.as_millis() as u64;
        self.store.append(&record).await.map_err(persistence)?;
        drop(guard);

        let intent = record.intent.map(|i| i.as_str()).unwrap_or("NONE");
        self.telemetry.record(TelemetryEvent::interaction(
            &record.session_id,
            record.turn_number,
            &record.transcript,
            &record.response,
            intent,
            record.confidence.unwrap_or(0.0),
            record.language.code(),
            record.latency_ms,
        ));

        let lead_complete = record.lead.is_complete();
        let newly_completed = lead_complete && !prior_complete;
        if newly_completed {
            tracing::info!(
                session_id = %record.session_id,
                turns = record.turn_number,
                "Lead completed"
            );
            self.telemetry.record(TelemetryEvent::LeadCompleted {
                session_id: record.session_id.clone(),
                turns: record.turn_number,
                language: record.language.code().to_string(),
            });
        }

        if elapsed > self.latency_alert {
            self.telemetry.record(TelemetryEvent::alert(
                Severity::Medium,
                "Slow turn",
                [
                    ("session_id", json!(record.session_id)),
                    ("latency_ms", json!(record.latency_ms)),
                    ("threshold_ms", json!(self.latency_alert.as_millis() as u64)),
                ],
            ));
        }

        tracing::info!(
            session_id = %record.session_id,
            turn = record.turn_number,
            intent,
            stage = record.stage.as_str(),
            latency_ms = record.latency_ms,
            "Turn recorded"
        );

        let (degraded, context) = match outcome {
            Some(outcome) => (outcome.degraded, outcome.context),
            None => (false, None),
        };
        Ok(TurnResult {
            record,
            lead_complete,
            newly_completed,
            degraded,
            context,
        })
    }

    /// Forget the turn lock of a session nobody is using
    pub fn release_session(&self, session_id: &str) {
        self.locks
            .remove_if(session_id, |_, lock| Arc::strong_count(lock) == 1);
    }

    /// Drop idle turn locks of sessions `live` no longer reports
    ///
    /// Locks held by a running turn survive and are picked up by a later
    /// sweep once that turn is done. Returns the number removed.
    pub fn retain_sessions<F>(&self, live: F) -> usize
    where
        F: Fn(&str) -> bool,
    {
        let before = self.locks.len();
        self.locks
            .retain(|id, lock| Arc::strong_count(lock) > 1 || live(id));
        before.saturating_sub(self.locks.len())
    }

    /// Remove a session's history and its lock
    pub async fn delete_session(&self, session_id: &str) -> Result<(), AgentError> {
        self.store
            .delete_session(session_id)
            .await
            .map_err(persistence)?;
        self.release_session(session_id);
        Ok(())
    }

    /// Sessions currently holding a turn lock entry
    pub fn tracked_sessions(&self) -> usize {
        self.locks.len()
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lead_agent_core::LeadRecord;

    #[test]
    fn test_language_precedence() {
        let prior = PriorLeadState {
            lead: LeadRecord::default(),
            language: Language::Tamil,
            turn_count: 1,
            stage: SessionStage::Greeting,
        };
        assert_eq!(
            resolve_language(Some(Language::Hindi), Some(&prior), Some(Language::English)),
            Language::Hindi
        );
        assert_eq!(
            resolve_language(None, Some(&prior), Some(Language::Hindi)),
            Language::Tamil
        );
        assert_eq!(resolve_language(None, None, Some(Language::Hindi)), Language::Hindi);
        assert_eq!(resolve_language(None, None, None), Language::English);
    }

    #[test]
    fn test_request_builder() {
        let request = TurnRequest::new("s", "hello")
            .with_language(Some(Language::Tamil))
            .with_audio_input_key(Some("s/input_1.wav".into()));
        assert_eq!(request.language, Some(Language::Tamil));
        assert_eq!(request.detected_language, None);
        assert_eq!(request.audio_input_key.as_deref(), Some("s/input_1.wav"));
    }
}
