//! Conversation persistence trait

use crate::{LeadSummary, PriorLeadState, Result, TurnRecord};
use async_trait::async_trait;

/// Turn-by-turn conversation storage
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// State left by the latest turn of a session, `None` for new sessions
    async fn load_latest(&self, session_id: &str) -> Result<Option<PriorLeadState>>;

    /// Append one turn and update the session summary
    async fn append(&self, turn: &TurnRecord) -> Result<()>;

    /// All turns of a session in turn order
    async fn turns(&self, session_id: &str) -> Result<Vec<TurnRecord>>;

    /// Aggregate over all turns of a session
    async fn lead_summary(&self, session_id: &str) -> Result<Option<LeadSummary>>;

    /// Drop all stored turns of a session
    async fn delete_session(&self, session_id: &str) -> Result<()>;

    /// Check connectivity
    async fn health_check(&self) -> bool {
        true
    }
}
