//! Backend selection from settings

use std::sync::Arc;

use lead_agent_config::{LlmProvider, LlmSettings};
use lead_agent_core::LanguageModel;

use crate::{LlmConfig, LlmError, OllamaBackend, OpenAiBackend};

/// Build the configured language model backend
pub fn create_backend(settings: &LlmSettings) -> Result<Arc<dyn LanguageModel>, LlmError> {
    let config = LlmConfig::from(settings);
    tracing::info!(
        provider = ?settings.provider,
        model = %config.model,
        endpoint = %config.endpoint,
        "Creating LLM backend"
    );
    let backend: Arc<dyn LanguageModel> = match settings.provider {
        LlmProvider::Ollama => Arc::new(OllamaBackend::new(config)?),
        LlmProvider::OpenAi => Arc::new(OpenAiBackend::new(config)?),
    };
    Ok(backend)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_ollama() {
        let backend = create_backend(&LlmSettings::default()).unwrap();
        assert_eq!(backend.model_name(), "qwen2.5:7b-instruct-q4_K_M");
    }

    #[test]
    fn test_openai_without_key_fails() {
        let settings = LlmSettings {
            provider: LlmProvider::OpenAi,
            api_key: None,
            ..Default::default()
        };
        assert!(create_backend(&settings).is_err());
    }
}
