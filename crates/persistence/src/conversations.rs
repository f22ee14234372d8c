//! Conversation turns and lead summaries in ScyllaDB

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use scylla::frame::response::result::Row;
use scylla::frame::value::CqlTimestamp;
use uuid::Uuid;

use lead_agent_core::{
    ConversationStore, Intent, Language, LeadRecord, LeadStatus, LeadSummary, PriorLeadState,
    SessionStage, TurnRecord,
};

use crate::{PersistenceError, ScyllaClient};

const TURN_COLUMNS: &str = "session_id, turn_number, id, transcript, response, language,
    intent, confidence, lead_json, stage, audio_input_key, audio_output_key,
    tokens_used, cost_usd, latency_ms, created_at";

const SUMMARY_COLUMNS: &str = "session_id, lead_json, language, total_turns, total_tokens,
    total_cost_usd, avg_confidence, confidence_samples, status, created_at, updated_at";

/// ScyllaDB-backed [`ConversationStore`]
#[derive(Clone)]
pub struct ScyllaConversationStore {
    client: ScyllaClient,
}

impl ScyllaConversationStore {
    pub fn new(client: ScyllaClient) -> Self {
        Self { client }
    }

    async fn latest_turn(&self, session_id: &str) -> Result<Option<TurnRecord>, PersistenceError> {
        // Clustering order is turn_number DESC, so the first row is the latest
        let query = format!(
            "SELECT {} FROM {}.conversations WHERE session_id = ? LIMIT 1",
            TURN_COLUMNS,
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (session_id,))
            .await?;

        match result.rows.and_then(|rows| rows.into_iter().next()) {
            Some(row) => Ok(Some(row_to_turn(row)?)),
            None => Ok(None),
        }
    }

    async fn all_turns(&self, session_id: &str) -> Result<Vec<TurnRecord>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM {}.conversations WHERE session_id = ? ORDER BY turn_number ASC",
            TURN_COLUMNS,
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (session_id,))
            .await?;

        result
            .rows
            .unwrap_or_default()
            .into_iter()
            .map(row_to_turn)
            .collect()
    }

    async fn insert_turn(&self, turn: &TurnRecord) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.conversations ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace(),
            TURN_COLUMNS
        );

        let lead_json = serde_json::to_string(&turn.lead)?;
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &turn.session_id,
                    to_int(turn.turn_number)?,
                    turn.id,
                    &turn.transcript,
                    &turn.response,
                    turn.language.code(),
                    turn.intent.map(|i| i.as_str()),
                    turn.confidence,
                    lead_json,
                    turn.stage.as_str(),
                    &turn.audio_input_key,
                    &turn.audio_output_key,
                    to_int(turn.tokens_used)?,
                    turn.cost_usd,
                    i64::try_from(turn.latency_ms).unwrap_or(i64::MAX),
                    timestamp(&turn.created_at),
                ),
            )
            .await?;

        Ok(())
    }

    async fn load_summary(&self, session_id: &str) -> Result<Option<LeadSummary>, PersistenceError> {
        let query = format!(
            "SELECT {} FROM {}.lead_summaries WHERE session_id = ?",
            SUMMARY_COLUMNS,
            self.client.keyspace()
        );

        let result = self
            .client
            .session()
            .query_unpaged(query, (session_id,))
            .await?;

        match result.rows.and_then(|rows| rows.into_iter().next()) {
            Some(row) => Ok(Some(row_to_summary(row)?)),
            None => Ok(None),
        }
    }

    async fn save_summary(&self, summary: &LeadSummary) -> Result<(), PersistenceError> {
        let query = format!(
            "INSERT INTO {}.lead_summaries ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            self.client.keyspace(),
            SUMMARY_COLUMNS
        );

        let lead_json = serde_json::to_string(&summary.lead)?;
        self.client
            .session()
            .query_unpaged(
                query,
                (
                    &summary.session_id,
                    lead_json,
                    summary.language.code(),
                    to_int(summary.total_turns)?,
                    i64::try_from(summary.total_tokens).unwrap_or(i64::MAX),
                    summary.total_cost_usd,
                    summary.avg_confidence,
                    to_int(summary.confidence_samples)?,
                    summary.status.as_str(),
                    timestamp(&summary.created_at),
                    timestamp(&summary.updated_at),
                ),
            )
            .await?;

        Ok(())
    }
}

#[async_trait]
impl ConversationStore for ScyllaConversationStore {
    async fn load_latest(&self, session_id: &str) -> lead_agent_core::Result<Option<PriorLeadState>> {
        let latest = self.latest_turn(session_id).await?;
        Ok(latest.as_ref().map(PriorLeadState::from))
    }

    async fn append(&self, turn: &TurnRecord) -> lead_agent_core::Result<()> {
        self.insert_turn(turn).await?;

        // Turns of one session are serialized upstream, so read-modify-write is safe here
        let summary = match self.load_summary(&turn.session_id).await? {
            Some(mut summary) => {
                summary.absorb(turn);
                summary
            }
            None => LeadSummary::start(turn),
        };
        self.save_summary(&summary).await?;

        tracing::debug!(
            session_id = %turn.session_id,
            turn = turn.turn_number,
            status = summary.status.as_str(),
            "Turn stored in ScyllaDB"
        );

        Ok(())
    }

    async fn turns(&self, session_id: &str) -> lead_agent_core::Result<Vec<TurnRecord>> {
        Ok(self.all_turns(session_id).await?)
    }

    async fn lead_summary(&self, session_id: &str) -> lead_agent_core::Result<Option<LeadSummary>> {
        Ok(self.load_summary(session_id).await?)
    }

    async fn delete_session(&self, session_id: &str) -> lead_agent_core::Result<()> {
        let keyspace = self.client.keyspace();
        for table in ["conversations", "lead_summaries"] {
            let query = format!("DELETE FROM {}.{} WHERE session_id = ?", keyspace, table);
            self.client
                .session()
                .query_unpaged(query, (session_id,))
                .await
                .map_err(PersistenceError::from)?;
        }

        tracing::info!(session_id = %session_id, "Session deleted from ScyllaDB");
        Ok(())
    }

    async fn health_check(&self) -> bool {
        let query = "SELECT release_version FROM system.local";
        match self.client.session().query_unpaged(query, &[]).await {
            Ok(_) => true,
            Err(e) => {
                tracing::warn!(error = %e, "ScyllaDB health check failed");
                false
            }
        }
    }
}

fn to_int(value: u32) -> Result<i32, PersistenceError> {
    i32::try_from(value).map_err(|_| PersistenceError::InvalidData(format!("{} out of range", value)))
}

fn timestamp(at: &DateTime<Utc>) -> CqlTimestamp {
    CqlTimestamp(at.timestamp_millis())
}

fn from_timestamp(ts: CqlTimestamp) -> Result<DateTime<Utc>, PersistenceError> {
    Utc.timestamp_millis_opt(ts.0)
        .single()
        .ok_or_else(|| PersistenceError::InvalidData(format!("invalid timestamp {}", ts.0)))
}

fn parse_lead(json: &str) -> Result<LeadRecord, PersistenceError> {
    Ok(serde_json::from_str(json)?)
}

fn row_to_turn(row: Row) -> Result<TurnRecord, PersistenceError> {
    let (
        session_id,
        turn_number,
        id,
        transcript,
        response,
        language,
        intent,
        confidence,
        lead_json,
        stage,
        audio_input_key,
        audio_output_key,
        tokens_used,
        cost_usd,
        latency_ms,
        created_at,
    ): (
        String,
        i32,
        Uuid,
        Option<String>,
        Option<String>,
        String,
        Option<String>,
        Option<f32>,
        String,
        String,
        Option<String>,
        Option<String>,
        i32,
        f64,
        i64,
        CqlTimestamp,
    ) = row
        .into_typed()
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    Ok(TurnRecord {
        id,
        session_id,
        turn_number: turn_number.max(0) as u32,
        transcript: transcript.unwrap_or_default(),
        response: response.unwrap_or_default(),
        language: Language::from_code_or_default(&language),
        intent: intent.as_deref().and_then(Intent::parse),
        confidence,
        lead: parse_lead(&lead_json)?,
        stage: SessionStage::parse(&stage),
        audio_input_key,
        audio_output_key,
        tokens_used: tokens_used.max(0) as u32,
        cost_usd,
        latency_ms: latency_ms.max(0) as u64,
        created_at: from_timestamp(created_at)?,
    })
}

fn row_to_summary(row: Row) -> Result<LeadSummary, PersistenceError> {
    let (
        session_id,
        lead_json,
        language,
        total_turns,
        total_tokens,
        total_cost_usd,
        avg_confidence,
        confidence_samples,
        status,
        created_at,
        updated_at,
    ): (
        String,
        String,
        String,
        i32,
        i64,
        f64,
        Option<f32>,
        Option<i32>,
        String,
        CqlTimestamp,
        CqlTimestamp,
    ) = row
        .into_typed()
        .map_err(|e| PersistenceError::InvalidData(e.to_string()))?;

    Ok(LeadSummary {
        session_id,
        lead: parse_lead(&lead_json)?,
        language: Language::from_code_or_default(&language),
        total_turns: total_turns.max(0) as u32,
        total_tokens: total_tokens.max(0) as u64,
        total_cost_usd,
        avg_confidence,
        status: LeadStatus::parse(&status),
        confidence_samples: confidence_samples.unwrap_or(0).max(0) as u32,
        created_at: from_timestamp(created_at)?,
        updated_at: from_timestamp(updated_at)?,
    })
}
