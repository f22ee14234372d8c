//! In-process conversation store

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use lead_agent_core::{ConversationStore, LeadSummary, PriorLeadState, Result, TurnRecord};

/// [`ConversationStore`] kept in memory, lost on restart
#[derive(Default)]
pub struct InMemoryConversationStore {
    sessions: RwLock<HashMap<String, Vec<TurnRecord>>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of sessions with at least one turn
    pub fn session_count(&self) -> usize {
        self.sessions.read().len()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn load_latest(&self, session_id: &str) -> Result<Option<PriorLeadState>> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .and_then(|turns| turns.last())
            .map(PriorLeadState::from))
    }

    async fn append(&self, turn: &TurnRecord) -> Result<()> {
        let mut sessions = self.sessions.write();
        let turns = sessions.entry(turn.session_id.clone()).or_default();
        turns.push(turn.clone());
        // Keep turn order even if a caller appends out of sequence
        if turns.len() > 1 && turns[turns.len() - 2].turn_number > turn.turn_number {
            turns.sort_by_key(|t| t.turn_number);
        }
        Ok(())
    }

    async fn turns(&self, session_id: &str) -> Result<Vec<TurnRecord>> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn lead_summary(&self, session_id: &str) -> Result<Option<LeadSummary>> {
        Ok(self
            .sessions
            .read()
            .get(session_id)
            .and_then(|turns| LeadSummary::from_turns(turns.iter())))
    }

    async fn delete_session(&self, session_id: &str) -> Result<()> {
        self.sessions.write().remove(session_id);
        Ok(())
    }
}
