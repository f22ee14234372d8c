//! Agent behaviour configuration

use serde::{Deserialize, Serialize};

/// Strategy used to classify utterances
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ClassifierKind {
    /// Ask the language model for a label
    #[default]
    Llm,
    /// Keyword and pattern matching, no model call
    Rules,
}

/// Agent configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub persona: PersonaConfig,

    #[serde(default)]
    pub classifier: ClassifierKind,

    /// Upper bound for any single model call made during a turn
    #[serde(default = "default_llm_timeout_ms")]
    pub llm_timeout_ms: u64,

    /// Turns slower than this raise a MEDIUM alert
    #[serde(default = "default_latency_alert_ms")]
    pub latency_alert_ms: u64,

    /// Sampling temperature for classification and responses
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Token cap for generated replies
    #[serde(default = "default_response_max_tokens")]
    pub response_max_tokens: u32,
}

fn default_llm_timeout_ms() -> u64 {
    8000
}

fn default_latency_alert_ms() -> u64 {
    3000
}

fn default_temperature() -> f32 {
    0.3
}

fn default_response_max_tokens() -> u32 {
    120
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            persona: PersonaConfig::default(),
            classifier: ClassifierKind::default(),
            llm_timeout_ms: default_llm_timeout_ms(),
            latency_alert_ms: default_latency_alert_ms(),
            temperature: default_temperature(),
            response_max_tokens: default_response_max_tokens(),
        }
    }
}

/// Who the assistant presents itself as
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonaConfig {
    #[serde(default = "default_agent_name")]
    pub name: String,

    #[serde(default = "default_company_name")]
    pub company: String,

    /// One sentence describing the company, embedded in system prompts
    #[serde(default = "default_company_blurb")]
    pub company_blurb: String,

    /// Word limit stated in response prompts
    #[serde(default = "default_max_words")]
    pub max_words: usize,
}

fn default_agent_name() -> String {
    "Riya".to_string()
}

fn default_company_name() -> String {
    "Synvolve Intellis".to_string()
}

fn default_company_blurb() -> String {
    "Synvolve Intellis designs, builds, and operates AI-powered systems that help businesses run smarter and faster.".to_string()
}

fn default_max_words() -> usize {
    30
}

impl Default for PersonaConfig {
    fn default() -> Self {
        Self {
            name: default_agent_name(),
            company: default_company_name(),
            company_blurb: default_company_blurb(),
            max_words: default_max_words(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_agent_defaults() {
        let config = AgentConfig::default();
        assert_eq!(config.persona.name, "Riya");
        assert_eq!(config.classifier, ClassifierKind::Llm);
        assert_eq!(config.latency_alert_ms, 3000);
    }

    #[test]
    fn test_partial_yaml_uses_defaults() {
        let config: AgentConfig = serde_yaml::from_str("classifier: rules\n").unwrap();
        assert_eq!(config.classifier, ClassifierKind::Rules);
        assert_eq!(config.llm_timeout_ms, 8000);
        assert_eq!(config.persona.company, "Synvolve Intellis");
    }
}
