//! Intent classification
//!
//! Two strategies sit behind [`IntentClassifier`]:
//! - [`LlmIntentClassifier`] asks the language model for one label
//! - [`RuleBasedClassifier`] matches phrases, with no model call
//!
//! Both report a fixed confidence. A classifier that cannot produce a label
//! returns `AgentError::Classification`; the orchestrator then falls back to
//! lead qualification.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use lead_agent_config::{AgentConfig, ClassifierKind};
use lead_agent_core::{Classification, Intent, LanguageModel, LeadField, LeadRecord};
use lead_agent_llm::PromptBuilder;

use crate::extractor::has_name_marker;
use crate::llm_call::{generate_bounded, LlmCallStats};
use crate::AgentError;

/// A classification plus the model call that produced it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Classified {
    pub classification: Classification,
    pub llm: Option<LlmCallStats>,
}

impl From<Classification> for Classified {
    fn from(classification: Classification) -> Self {
        Self {
            classification,
            llm: None,
        }
    }
}

/// Maps an utterance and the lead state to an intent
#[async_trait]
pub trait IntentClassifier: Send + Sync + 'static {
    async fn classify(&self, transcript: &str, lead: &LeadRecord) -> Result<Classified, AgentError>;

    /// Strategy name for logs
    fn name(&self) -> &'static str;
}

/// Build the classifier selected in `config`
pub fn create_classifier(
    config: &AgentConfig,
    llm: Arc<dyn LanguageModel>,
) -> Arc<dyn IntentClassifier> {
    match config.classifier {
        ClassifierKind::Llm => Arc::new(
            LlmIntentClassifier::new(llm, PromptBuilder::new(config.persona.clone()))
                .with_timeout(Duration::from_millis(config.llm_timeout_ms))
                .with_temperature(config.temperature),
        ),
        ClassifierKind::Rules => Arc::new(RuleBasedClassifier::new()),
    }
}

/// Classifier that asks the model for a single label
pub struct LlmIntentClassifier {
    llm: Arc<dyn LanguageModel>,
    prompts: PromptBuilder,
    timeout: Duration,
    temperature: f32,
}

impl LlmIntentClassifier {
    pub fn new(llm: Arc<dyn LanguageModel>, prompts: PromptBuilder) -> Self {
        Self {
            llm,
            prompts,
            timeout: Duration::from_millis(8000),
            temperature: 0.3,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }
}

#[async_trait]
impl IntentClassifier for LlmIntentClassifier {
    async fn classify(&self, transcript: &str, lead: &LeadRecord) -> Result<Classified, AgentError> {
        let request = self
            .prompts
            .classification(transcript, lead)
            .with_temperature(self.temperature);
        let (response, stats) = generate_bounded(self.llm.as_ref(), request, self.timeout).await?;

        let intent = Intent::from_label(&response.text).ok_or_else(|| {
            AgentError::Classification(format!("unrecognized label {:?}", response.text.trim()))
        })?;

        Ok(Classified {
            classification: Classification::new(intent),
            llm: Some(stats),
        })
    }

    fn name(&self) -> &'static str {
        "llm"
    }
}

const OBJECTION_PHRASES: &[&str] = &[
    "not interested",
    "don't want",
    "dont want",
    "no thanks",
    "no thank you",
    "not now",
    "maybe later",
    "nahi chahiye",
    "interest nahi",
    "नहीं चाहिए",
    "रुचि नहीं",
    "venam",
    "vendam",
    "வேண்டாம்",
    "ஆர்வம் இல்லை",
];

const GREETING_WORDS: &[&str] = &[
    "hi",
    "hello",
    "hey",
    "namaste",
    "namaskar",
    "vanakkam",
    "नमस्ते",
    "வணக்கம்",
];

const GREETING_PHRASES: &[&str] = &["good morning", "good afternoon", "good evening"];

/// Longest utterance still treated as a bare greeting
const MAX_GREETING_WORDS: usize = 4;

static QUESTION_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(what|which|how|why|when|where|tell me|explain|services?|offer|products?|pric(e|es|ing)|cost|timeline|do you|can you|kya|kaise|kitna|enna|eppadi|evlo)\b",
    )
    .unwrap()
});

/// Non-Latin question words, matched as substrings
const QUESTION_WORDS_NATIVE: &[&str] = &["क्या", "कैसे", "कितना", "என்ன", "எப்படி", "எவ்வளவு"];

/// Phrase-matching classifier, no model call
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedClassifier;

impl RuleBasedClassifier {
    pub fn new() -> Self {
        Self
    }

    /// Synchronous decision, exposed for callers without a runtime
    pub fn decide(&self, transcript: &str, lead: &LeadRecord) -> Intent {
        let text = transcript.trim().to_lowercase();

        if OBJECTION_PHRASES.iter().any(|p| text.contains(p)) {
            return Intent::Objection;
        }
        if !lead.is_filled(LeadField::Name) && has_name_marker(&text) {
            return Intent::LeadQualification;
        }
        if is_greeting(&text) {
            return Intent::Greeting;
        }
        if text.contains('?')
            || QUESTION_PATTERN.is_match(&text)
            || QUESTION_WORDS_NATIVE.iter().any(|w| text.contains(w))
        {
            return Intent::ServiceInquiry;
        }
        Intent::LeadQualification
    }
}

fn is_greeting(text: &str) -> bool {
    let words: Vec<&str> = text
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| c.is_ascii_punctuation() || c == '।'))
        .filter(|w| !w.is_empty())
        .collect();
    if words.is_empty() || words.len() > MAX_GREETING_WORDS {
        return false;
    }
    GREETING_WORDS.contains(&words[0])
        || GREETING_PHRASES
            .iter()
            .any(|p| words.join(" ").starts_with(p))
}

#[async_trait]
impl IntentClassifier for RuleBasedClassifier {
    async fn classify(&self, transcript: &str, lead: &LeadRecord) -> Result<Classified, AgentError> {
        Ok(Classification::new(self.decide(transcript, lead)).into())
    }

    fn name(&self) -> &'static str {
        "rules"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedLlm;
    use lead_agent_core::{Error, NextAction, DEFAULT_CONFIDENCE};

    fn llm_classifier(llm: Arc<ScriptedLlm>) -> LlmIntentClassifier {
        LlmIntentClassifier::new(llm, PromptBuilder::default())
    }

    #[tokio::test]
    async fn test_llm_label_parsing() {
        let cases = [
            ("GREETING", Intent::Greeting),
            ("objection.", Intent::Objection),
            ("SERVICE_INQUIRY", Intent::ServiceInquiry),
            ("Service", Intent::ServiceInquiry),
            ("LEAD_QUALIFICATION", Intent::LeadQualification),
            ("qualification", Intent::LeadQualification),
        ];
        for (label, expected) in cases {
            let llm = Arc::new(ScriptedLlm::new().reply(label));
            let classified = llm_classifier(llm)
                .classify("hello", &LeadRecord::default())
                .await
                .unwrap();
            assert_eq!(classified.classification.intent, expected, "label {label:?}");
            assert_eq!(classified.classification.confidence, DEFAULT_CONFIDENCE);
            assert_eq!(classified.llm.as_ref().map(|s| s.total_tokens()), Some(25));
        }
    }

    #[tokio::test]
    async fn test_llm_unknown_label_is_classification_error() {
        let llm = Arc::new(ScriptedLlm::new().reply("I am not sure"));
        let err = llm_classifier(llm)
            .classify("hmm", &LeadRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Classification(_)));
    }

    #[tokio::test]
    async fn test_llm_failure_propagates() {
        let llm = Arc::new(ScriptedLlm::new().fail(Error::Llm("down".into())));
        let err = llm_classifier(llm)
            .classify("hmm", &LeadRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Generation(_)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_llm_timeout() {
        let llm = Arc::new(
            ScriptedLlm::new()
                .with_delay(Duration::from_secs(30))
                .reply("GREETING"),
        );
        let classifier = llm_classifier(llm).with_timeout(Duration::from_millis(100));
        let err = classifier
            .classify("hello", &LeadRecord::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_llm_prompt_carries_lead_status() {
        let llm = Arc::new(ScriptedLlm::new().reply("LEAD_QUALIFICATION"));
        let lead = LeadRecord {
            name: Some("John".into()),
            ..Default::default()
        };
        llm_classifier(llm.clone())
            .classify("9876543210", &lead)
            .await
            .unwrap();
        let prompt = llm.requests()[0].prompt_text();
        assert!(prompt.contains("- Name: John"));
        assert!(prompt.contains("- Phone: Not provided"));
    }

    #[test]
    fn test_rules_objection_first() {
        let rules = RuleBasedClassifier;
        let empty = LeadRecord::default();
        assert_eq!(rules.decide("Not interested, thanks", &empty), Intent::Objection);
        assert_eq!(rules.decide("hi, maybe later", &empty), Intent::Objection);
        assert_eq!(rules.decide("मुझे नहीं चाहिए", &empty), Intent::Objection);
    }

    #[test]
    fn test_rules_greeting() {
        let rules = RuleBasedClassifier;
        let empty = LeadRecord::default();
        assert_eq!(rules.decide("Hi there", &empty), Intent::Greeting);
        assert_eq!(rules.decide("Good morning!", &empty), Intent::Greeting);
        assert_eq!(rules.decide("வணக்கம்", &empty), Intent::Greeting);
        // too long to be a bare greeting
        assert_eq!(
            rules.decide("hello I would like a voice bot for my shop", &empty),
            Intent::LeadQualification
        );
    }

    #[test]
    fn test_rules_introduction_beats_greeting() {
        let rules = RuleBasedClassifier;
        assert_eq!(
            rules.decide("Hi, I am John", &LeadRecord::default()),
            Intent::LeadQualification
        );
    }

    #[test]
    fn test_rules_service_inquiry() {
        let rules = RuleBasedClassifier;
        let empty = LeadRecord::default();
        for text in [
            "what services do you offer",
            "How much does it cost",
            "Do you build chatbots?",
            "aapki services kya hai",
            "உங்கள் சேவைகள் என்ன",
        ] {
            assert_eq!(rules.decide(text, &empty), Intent::ServiceInquiry, "input {text:?}");
        }
    }

    #[test]
    fn test_rules_default_is_lead_qualification() {
        let rules = RuleBasedClassifier;
        let lead = LeadRecord {
            name: Some("John".into()),
            phone: Some("9876543210".into()),
            company: Some("Acme".into()),
            requirement: None,
        };
        let intent = rules.decide("I need a chatbot for my website", &lead);
        assert_eq!(intent, Intent::LeadQualification);
        assert_eq!(intent.next_action(), NextAction::Extract);
        assert_eq!(rules.decide("9876543210", &lead), Intent::LeadQualification);
    }

    #[tokio::test]
    async fn test_factory_picks_strategy() {
        let llm: Arc<dyn LanguageModel> = Arc::new(ScriptedLlm::new());
        let mut config = AgentConfig::default();
        assert_eq!(create_classifier(&config, llm.clone()).name(), "llm");
        config.classifier = ClassifierKind::Rules;
        assert_eq!(create_classifier(&config, llm).name(), "rules");
    }
}
