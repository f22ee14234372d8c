//! Conversation turns and per-session aggregates

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Intent, Language, LeadRecord};

/// Coarse position of a session in the qualification flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SessionStage {
    #[default]
    Greeting,
    Qualification,
    Information,
    Closing,
    Complete,
}

impl SessionStage {
    /// Stage reached after a turn with the given intent
    pub fn after_turn(intent: Option<Intent>, lead: &LeadRecord, previous: SessionStage) -> Self {
        if lead.is_complete() {
            return Self::Complete;
        }
        match intent {
            Some(Intent::Greeting) => Self::Greeting,
            Some(Intent::ServiceInquiry) => Self::Information,
            Some(Intent::LeadQualification) => Self::Qualification,
            Some(Intent::Objection) | Some(Intent::Closing) => Self::Closing,
            None => previous,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Greeting => "greeting",
            Self::Qualification => "qualification",
            Self::Information => "information",
            Self::Closing => "closing",
            Self::Complete => "complete",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "qualification" => Self::Qualification,
            "information" => Self::Information,
            "closing" => Self::Closing,
            "complete" => Self::Complete,
            _ => Self::Greeting,
        }
    }
}

impl std::fmt::Display for SessionStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One persisted request/response exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnRecord {
    pub id: uuid::Uuid,
    pub session_id: String,
    /// 1-based, monotonic per session
    pub turn_number: u32,
    pub transcript: String,
    pub response: String,
    pub language: Language,
    /// `None` when the turn never reached classification
    pub intent: Option<Intent>,
    pub confidence: Option<f32>,
    /// Lead state after this turn
    pub lead: LeadRecord,
    pub stage: SessionStage,
    pub audio_input_key: Option<String>,
    pub audio_output_key: Option<String>,
    pub tokens_used: u32,
    pub cost_usd: f64,
    pub latency_ms: u64,
    pub created_at: DateTime<Utc>,
}

impl TurnRecord {
    pub fn new(session_id: impl Into<String>, turn_number: u32) -> Self {
        Self {
            id: uuid::Uuid::new_v4(),
            session_id: session_id.into(),
            turn_number,
            transcript: String::new(),
            response: String::new(),
            language: Language::default(),
            intent: None,
            confidence: None,
            lead: LeadRecord::default(),
            stage: SessionStage::default(),
            audio_input_key: None,
            audio_output_key: None,
            tokens_used: 0,
            cost_usd: 0.0,
            latency_ms: 0,
            created_at: Utc::now(),
        }
    }
}

/// State a new turn starts from, taken from the latest stored turn
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriorLeadState {
    pub lead: LeadRecord,
    pub language: Language,
    pub turn_count: u32,
    pub stage: SessionStage,
}

impl From<&TurnRecord> for PriorLeadState {
    fn from(turn: &TurnRecord) -> Self {
        Self {
            lead: turn.lead.clone(),
            language: turn.language,
            turn_count: turn.turn_number,
            stage: turn.stage,
        }
    }
}

/// Outcome of a session as seen by lead handoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeadStatus {
    Complete,
    Incomplete,
    Objection,
}

impl LeadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Complete => "complete",
            Self::Incomplete => "incomplete",
            Self::Objection => "objection",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "complete" => Self::Complete,
            "objection" => Self::Objection,
            _ => Self::Incomplete,
        }
    }
}

/// Aggregate view over all turns of a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeadSummary {
    pub session_id: String,
    pub lead: LeadRecord,
    pub language: Language,
    pub total_turns: u32,
    pub total_tokens: u64,
    pub total_cost_usd: f64,
    pub avg_confidence: Option<f32>,
    pub status: LeadStatus,
    /// Number of turns that contributed to `avg_confidence`
    #[serde(default)]
    pub confidence_samples: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LeadSummary {
    /// Summary of a session with a single turn
    pub fn start(turn: &TurnRecord) -> Self {
        let mut summary = Self {
            session_id: turn.session_id.clone(),
            lead: LeadRecord::default(),
            language: turn.language,
            total_turns: 0,
            total_tokens: 0,
            total_cost_usd: 0.0,
            avg_confidence: None,
            status: LeadStatus::Incomplete,
            confidence_samples: 0,
            created_at: turn.created_at,
            updated_at: turn.created_at,
        };
        summary.absorb(turn);
        summary
    }

    /// Fold the next turn into the summary
    pub fn absorb(&mut self, turn: &TurnRecord) {
        self.lead = turn.lead.clone();
        self.language = turn.language;
        self.total_turns = self.total_turns.max(turn.turn_number);
        self.total_tokens += u64::from(turn.tokens_used);
        self.total_cost_usd += turn.cost_usd;
        if let Some(confidence) = turn.confidence {
            let n = self.confidence_samples as f32;
            let avg = self.avg_confidence.unwrap_or(0.0);
            self.avg_confidence = Some((avg * n + confidence) / (n + 1.0));
            self.confidence_samples += 1;
        }
        self.status = if turn.lead.is_complete() {
            LeadStatus::Complete
        } else if turn.intent == Some(Intent::Objection) {
            LeadStatus::Objection
        } else {
            LeadStatus::Incomplete
        };
        self.updated_at = turn.created_at;
    }

    /// Summary folded from turns in order
    pub fn from_turns<'a>(turns: impl IntoIterator<Item = &'a TurnRecord>) -> Option<Self> {
        let mut iter = turns.into_iter();
        let mut summary = Self::start(iter.next()?);
        for turn in iter {
            summary.absorb(turn);
        }
        Some(summary)
    }
}
