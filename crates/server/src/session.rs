//! Session registry
//!
//! Tracks which conversations are live on this instance. History lives in
//! the conversation store; a session here is only bookkeeping (activity,
//! turn count, language) used for capacity and idle eviction.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::watch;

use lead_agent_agent::ConversationService;
use lead_agent_config::ServerConfig;
use lead_agent_core::Language;

use crate::ServerError;

const MAX_SESSION_ID_LEN: usize = 128;

/// Live session
#[derive(Debug)]
pub struct Session {
    pub id: String,
    pub created_at: DateTime<Utc>,
    last_activity: RwLock<Instant>,
    turns: AtomicU32,
    language: RwLock<Option<Language>>,
}

impl Session {
    fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            created_at: Utc::now(),
            last_activity: RwLock::new(Instant::now()),
            turns: AtomicU32::new(0),
            language: RwLock::new(None),
        }
    }

    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    /// Note a completed turn
    pub fn record_turn(&self, turn_number: u32, language: Language) {
        self.turns.fetch_max(turn_number, Ordering::Relaxed);
        *self.language.write() = Some(language);
        self.touch();
    }

    pub fn turns(&self) -> u32 {
        self.turns.load(Ordering::Relaxed)
    }

    pub fn language(&self) -> Option<Language> {
        *self.language.read()
    }

    pub fn idle_for(&self) -> Duration {
        self.last_activity.read().elapsed()
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.idle_for() > timeout
    }

    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.id.clone(),
            created_at: self.created_at,
            idle_secs: self.idle_for().as_secs(),
            turns: self.turns(),
            language: self.language().map(|l| l.code()),
        }
    }
}

/// Serializable view of a session
#[derive(Debug, Clone, Serialize)]
pub struct SessionInfo {
    pub session_id: String,
    pub created_at: DateTime<Utc>,
    pub idle_secs: u64,
    pub turns: u32,
    pub language: Option<&'static str>,
}

/// Client-supplied ids double as audio folder names
pub fn validate_session_id(id: &str) -> Result<(), ServerError> {
    let valid = !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LEN
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(ServerError::InvalidRequest(format!(
            "session_id must be 1-{} characters of [A-Za-z0-9_-]",
            MAX_SESSION_ID_LEN
        )))
    }
}

/// Session manager
pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize) -> Self {
        Self::with_config(max_sessions, Duration::from_secs(3600), Duration::from_secs(300))
    }

    pub fn with_config(
        max_sessions: usize,
        session_timeout: Duration,
        cleanup_interval: Duration,
    ) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::with_config(
            config.max_sessions,
            Duration::from_secs(config.session_timeout_secs),
            Duration::from_secs(config.cleanup_interval_secs),
        )
    }

    /// Periodically evict idle sessions and release their turn locks
    ///
    /// Send `true` on the returned channel to stop the task.
    pub fn start_cleanup_task(
        self: &Arc<Self>,
        service: Arc<ConversationService>,
    ) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);
        let interval = manager.cleanup_interval;

        tokio::spawn(async move {
            let mut interval_timer = tokio::time::interval(interval);
            interval_timer.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = interval_timer.tick() => {
                        let expired = manager.evict_idle(&service);
                        if !expired.is_empty() {
                            tracing::info!(
                                removed = expired.len(),
                                remaining = manager.count(),
                                "Session cleanup"
                            );
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            tracing::info!("Session cleanup task shutting down");
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    /// Existing session for `id`, or a new one
    ///
    /// Without an id a fresh one is generated. A known id resumes its
    /// history from the conversation store even after a restart.
    pub fn get_or_create(&self, id: Option<&str>) -> Result<Arc<Session>, ServerError> {
        if let Some(id) = id {
            validate_session_id(id)?;
            if let Some(session) = self.get(id) {
                session.touch();
                return Ok(session);
            }
        }

        let mut sessions = self.sessions.write();
        if let Some(session) = id.and_then(|id| sessions.get(id)) {
            session.touch();
            return Ok(session.clone());
        }

        if sessions.len() >= self.max_sessions {
            self.cleanup_expired_internal(&mut sessions);

            if sessions.len() >= self.max_sessions {
                return Err(ServerError::Session("Max sessions reached".to_string()));
            }
        }

        let id = id
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let session = Arc::new(Session::new(&id));
        sessions.insert(id.clone(), session.clone());

        tracing::info!(session_id = %id, active = sessions.len(), "Created session");
        Ok(session)
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.sessions.read().get(id).cloned()
    }

    pub fn remove(&self, id: &str) -> bool {
        let removed = self.sessions.write().remove(id).is_some();
        if removed {
            tracing::info!(session_id = %id, "Removed session");
        }
        removed
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    /// Drop idle sessions and every turn lock no registered session owns
    ///
    /// Also catches locks that were still held when their session expired.
    pub fn evict_idle(&self, service: &ConversationService) -> Vec<String> {
        let expired = self.cleanup_expired();
        let released = service.retain_sessions(|id| self.get(id).is_some());
        if released > 0 {
            tracing::debug!(released, "Released turn locks");
        }
        expired
    }

    /// Drop idle sessions, returning their ids
    pub fn cleanup_expired(&self) -> Vec<String> {
        let mut sessions = self.sessions.write();
        self.cleanup_expired_internal(&mut sessions)
    }

    fn cleanup_expired_internal(&self, sessions: &mut HashMap<String, Arc<Session>>) -> Vec<String> {
        let timeout = self.session_timeout;
        let expired: Vec<String> = sessions
            .iter()
            .filter(|(_, s)| s.is_expired(timeout))
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            sessions.remove(id);
            tracing::info!(session_id = %id, "Expired session");
        }
        expired
    }

    pub fn list(&self) -> Vec<SessionInfo> {
        let mut sessions: Vec<SessionInfo> =
            self.sessions.read().values().map(|s| s.info()).collect();
        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        sessions
    }
}
