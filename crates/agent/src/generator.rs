//! Response generation
//!
//! Greetings and objections get a canned reply from the message catalog.
//! Service questions and qualification turns are composed by the language
//! model from the persona prompt, the retrieved context and the lead state.

use std::sync::Arc;
use std::time::Duration;

use lead_agent_config::{AgentConfig, MessageCatalog, MessageKind};
use lead_agent_core::{GenerateRequest, Intent, Language, LanguageModel, LeadRecord};
use lead_agent_llm::PromptBuilder;

use crate::llm_call::{generate_bounded, LlmCallStats};
use crate::AgentError;

/// A reply and the model call behind it, if any
#[derive(Debug, Clone, PartialEq)]
pub struct Generated {
    pub text: String,
    pub llm: Option<LlmCallStats>,
}

/// Produces the assistant's next utterance
pub struct ResponseGenerator {
    llm: Arc<dyn LanguageModel>,
    prompts: PromptBuilder,
    messages: Arc<MessageCatalog>,
    timeout: Duration,
    temperature: f32,
    max_tokens: u32,
}

impl ResponseGenerator {
    pub fn new(
        llm: Arc<dyn LanguageModel>,
        prompts: PromptBuilder,
        messages: Arc<MessageCatalog>,
    ) -> Self {
        let defaults = AgentConfig::default();
        Self {
            llm,
            prompts,
            messages,
            timeout: Duration::from_millis(defaults.llm_timeout_ms),
            temperature: defaults.temperature,
            max_tokens: defaults.response_max_tokens,
        }
    }

    pub fn from_config(
        config: &AgentConfig,
        llm: Arc<dyn LanguageModel>,
        messages: Arc<MessageCatalog>,
    ) -> Self {
        Self::new(llm, PromptBuilder::new(config.persona.clone()), messages)
            .with_timeout(Duration::from_millis(config.llm_timeout_ms))
            .with_temperature(config.temperature)
            .with_max_tokens(config.response_max_tokens)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn messages(&self) -> &MessageCatalog {
        &self.messages
    }

    /// Reply used in place of a failed generation
    pub fn fallback(&self, language: Language) -> String {
        self.messages.get(MessageKind::Fallback, language).to_string()
    }

    /// Model request for `intent`, or `None` when the reply is canned
    pub fn build_request(
        &self,
        intent: Intent,
        language: Language,
        lead: &LeadRecord,
        context: Option<&str>,
        transcript: &str,
    ) -> Option<GenerateRequest> {
        let instruction = match intent {
            Intent::Greeting | Intent::Objection => return None,
            Intent::ServiceInquiry => self.prompts.service_instruction(transcript),
            Intent::LeadQualification | Intent::Closing => {
                self.prompts.qualification_instruction(transcript, lead)
            }
        };
        let system = self.prompts.system_prompt(language, context);
        Some(
            self.prompts
                .reply(system, instruction)
                .with_temperature(self.temperature)
                .with_max_tokens(self.max_tokens),
        )
    }

    /// Next utterance for this turn
    ///
    /// Model output is returned trimmed and otherwise untouched. A failed,
    /// timed out or empty generation is an error; substituting the fallback
    /// reply is up to the caller.
    pub async fn generate(
        &self,
        intent: Intent,
        language: Language,
        lead: &LeadRecord,
        context: Option<&str>,
        transcript: &str,
    ) -> Result<Generated, AgentError> {
        let Some(request) = self.build_request(intent, language, lead, context, transcript) else {
            let kind = if intent == Intent::Objection {
                MessageKind::Objection
            } else {
                MessageKind::Greeting
            };
            return Ok(Generated {
                text: self.messages.get(kind, language).to_string(),
                llm: None,
            });
        };

        let (response, stats) = generate_bounded(self.llm.as_ref(), request, self.timeout).await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(AgentError::Generation("empty response".to_string()));
        }
        Ok(Generated {
            text: text.to_string(),
            llm: Some(stats),
        })
    }
}
