//! Turn orchestration
//!
//! One call to [`TurnOrchestrator::process`] runs one turn through a fixed
//! state machine:
//!
//! ```text
//! ClassifyIntent --greeting/objection--> GenerateResponse
//! ClassifyIntent --service inquiry-----> RetrieveContext --> GenerateResponse
//! ClassifyIntent --lead qualification--> ExtractLeadData --> GenerateResponse
//! GenerateResponse --> Done
//! ```
//!
//! Component failures never escape: an unusable classification becomes lead
//! qualification, and a failed generation becomes the fallback reply with
//! the lead left as it was before the turn. Results depend on model output,
//! so replaying the same input is not guaranteed to give the same outcome.

use std::future::Future;
use std::sync::Arc;

use serde::Serialize;
use serde_json::json;

use lead_agent_core::{
    Classification, Intent, Language, LeadRecord, NextAction, Severity, Telemetry, TelemetryEvent,
};
use lead_agent_rag::KnowledgeRetriever;

use crate::classifier::IntentClassifier;
use crate::extractor::{Extraction, FieldExtractor};
use crate::generator::ResponseGenerator;
use crate::llm_call::LlmCallStats;

/// State of the per-turn machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStep {
    ClassifyIntent,
    RetrieveContext,
    ExtractLeadData,
    GenerateResponse,
    Done,
}

impl TurnStep {
    /// Transition table, total over every state and intent
    pub fn next(self, intent: Intent) -> TurnStep {
        match self {
            TurnStep::ClassifyIntent => match intent.next_action() {
                NextAction::Retrieve => TurnStep::RetrieveContext,
                NextAction::Extract => TurnStep::ExtractLeadData,
                NextAction::Generate => TurnStep::GenerateResponse,
            },
            TurnStep::RetrieveContext | TurnStep::ExtractLeadData => TurnStep::GenerateResponse,
            TurnStep::GenerateResponse | TurnStep::Done => TurnStep::Done,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TurnStep::ClassifyIntent => "classify_intent",
            TurnStep::RetrieveContext => "retrieve_context",
            TurnStep::ExtractLeadData => "extract_lead_data",
            TurnStep::GenerateResponse => "generate_response",
            TurnStep::Done => "done",
        }
    }
}

/// Everything a turn starts from
#[derive(Debug, Clone)]
pub struct TurnInput {
    pub session_id: String,
    pub transcript: String,
    pub language: Language,
    /// Lead as of the previous turn
    pub lead: LeadRecord,
    /// Turns already completed in this session
    pub turn_count: u32,
}

/// Result of one turn
#[derive(Debug, Clone)]
pub struct TurnOutcome {
    pub response: String,
    /// Lead after the turn; equals the input lead when generation failed
    pub lead: LeadRecord,
    pub classification: Classification,
    /// Retrieved context, service inquiries only
    pub context: Option<String>,
    /// Extraction attempt, lead qualification only
    pub extraction: Option<Extraction>,
    pub tokens_used: u32,
    pub cost_usd: f64,
    /// Set when the fallback reply replaced a failed generation
    pub degraded: bool,
    /// States visited, in order
    pub steps: Vec<TurnStep>,
}

impl TurnOutcome {
    fn start(input: &TurnInput) -> Self {
        Self {
            response: String::new(),
            lead: input.lead.clone(),
            classification: Classification::fallback(),
            context: None,
            extraction: None,
            tokens_used: 0,
            cost_usd: 0.0,
            degraded: false,
            steps: Vec::with_capacity(3),
        }
    }

    pub fn intent(&self) -> Intent {
        self.classification.intent
    }

    pub fn lead_complete(&self) -> bool {
        self.lead.is_complete()
    }
}

/// Runs turns against shared, read-only components
pub struct TurnOrchestrator {
    classifier: Arc<dyn IntentClassifier>,
    extractor: FieldExtractor,
    retriever: Arc<KnowledgeRetriever>,
    generator: ResponseGenerator,
    telemetry: Arc<dyn Telemetry>,
}

impl TurnOrchestrator {
    pub fn new(
        classifier: Arc<dyn IntentClassifier>,
        retriever: Arc<KnowledgeRetriever>,
        generator: ResponseGenerator,
        telemetry: Arc<dyn Telemetry>,
    ) -> Self {
        Self {
            classifier,
            extractor: FieldExtractor::new(),
            retriever,
            generator,
            telemetry,
        }
    }

    pub fn generator(&self) -> &ResponseGenerator {
        &self.generator
    }

    pub fn retriever(&self) -> &KnowledgeRetriever {
        &self.retriever
    }

    /// Run one turn to completion; always yields a response
    pub async fn process(&self, input: TurnInput) -> TurnOutcome {
        let mut outcome = TurnOutcome::start(&input);
        let mut step = TurnStep::ClassifyIntent;

        while step != TurnStep::Done {
            outcome.steps.push(step);
            match step {
                TurnStep::ClassifyIntent => self.classify(&input, &mut outcome).await,
                TurnStep::RetrieveContext => self.retrieve(&input, &mut outcome),
                TurnStep::ExtractLeadData => self.extract(&input, &mut outcome),
                TurnStep::GenerateResponse => self.respond(&input, &mut outcome).await,
                TurnStep::Done => {}
            }
            step = step.next(outcome.intent());
        }
        self.record_extraction(&input, &outcome);

        tracing::debug!(
            session_id = %input.session_id,
            turn = input.turn_count + 1,
            intent = outcome.intent().as_str(),
            steps = ?outcome.steps.iter().map(TurnStep::as_str).collect::<Vec<_>>(),
            degraded = outcome.degraded,
            "Turn processed"
        );
        outcome
    }

    /// Run one turn unless `cancel` resolves first
    ///
    /// A cancelled turn yields `None`; its lead changes only ever existed in
    /// the dropped outcome.
    pub async fn process_until<F>(&self, input: TurnInput, cancel: F) -> Option<TurnOutcome>
    where
        F: Future<Output = ()>,
    {
        let session_id = input.session_id.clone();
        tokio::select! {
            biased;
            _ = cancel => {
                tracing::info!(session_id = %session_id, "Turn cancelled");
                None
            }
            outcome = self.process(input) => Some(outcome),
        }
    }

    async fn classify(&self, input: &TurnInput, outcome: &mut TurnOutcome) {
        match self.classifier.classify(&input.transcript, &input.lead).await {
            Ok(classified) => {
                if let Some(stats) = &classified.llm {
                    self.account(stats, outcome);
                }
                outcome.classification = classified.classification;
            }
            Err(e) => {
                tracing::warn!(
                    session_id = %input.session_id,
                    classifier = self.classifier.name(),
                    error = %e,
                    "classification_fallback"
                );
                outcome.classification = Classification::fallback();
            }
        }
    }

    fn retrieve(&self, input: &TurnInput, outcome: &mut TurnOutcome) {
        let context = self.retriever.get_context(&input.transcript);
        self.telemetry.record(TelemetryEvent::rag_retrieval(
            &input.session_id,
            &input.transcript,
            context.len(),
        ));
        outcome.context = Some(context);
    }

    fn extract(&self, input: &TurnInput, outcome: &mut TurnOutcome) {
        let extraction = self.extractor.extract_field(&input.transcript, &outcome.lead);
        outcome.lead = extraction.lead.clone();
        outcome.extraction = Some(extraction);
    }

    /// Reported once the reply is settled, so a rolled-back value is not validated
    fn record_extraction(&self, input: &TurnInput, outcome: &TurnOutcome) {
        let Some(extraction) = &outcome.extraction else {
            return;
        };
        if let Some(field) = extraction.field {
            self.telemetry.record(TelemetryEvent::extraction(
                &input.session_id,
                field.as_str(),
                extraction.candidate.as_deref(),
                extraction.filled,
            ));
        }
    }

    async fn respond(&self, input: &TurnInput, outcome: &mut TurnOutcome) {
        let result = self
            .generator
            .generate(
                outcome.intent(),
                input.language,
                &outcome.lead,
                outcome.context.as_deref(),
                &input.transcript,
            )
            .await;

        match result {
            Ok(generated) => {
                if let Some(stats) = &generated.llm {
                    self.account(stats, outcome);
                }
                outcome.response = generated.text;
            }
            Err(e) => {
                tracing::error!(
                    session_id = %input.session_id,
                    intent = outcome.intent().as_str(),
                    error = %e,
                    "Response generation failed, using fallback reply"
                );
                self.telemetry.record(TelemetryEvent::alert(
                    Severity::High,
                    "Response generation failed",
                    [
                        ("session_id", json!(input.session_id)),
                        ("intent", json!(outcome.intent().as_str())),
                        ("error", json!(e.to_string())),
                    ],
                ));
                outcome.response = self.generator.fallback(input.language);
                outcome.lead = input.lead.clone();
                if let Some(extraction) = outcome.extraction.as_mut() {
                    extraction.lead = input.lead.clone();
                    extraction.filled = false;
                }
                outcome.degraded = true;
            }
        }
    }

    fn account(&self, stats: &LlmCallStats, outcome: &mut TurnOutcome) {
        outcome.tokens_used += stats.total_tokens();
        outcome.cost_usd += stats.cost_usd;
        self.telemetry.record(stats.to_event());
    }
}
