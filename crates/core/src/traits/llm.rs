//! Language Model traits

use crate::{GenerateRequest, GenerateResponse, Result};
use async_trait::async_trait;

/// Language Model interface
///
/// Implementations:
/// - `OllamaBackend` - Local Ollama inference
/// - `OpenAiBackend` - OpenAI-compatible chat completions
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OllamaBackend::new(config)?);
/// let request = GenerateRequest::new("You are Riya")
///     .with_user_message("What services do you offer?");
/// let response = llm.generate(request).await?;
/// println!("{}", response.text);
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate completion
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Check if model is available
    ///
    /// Returns false if model is not loaded or backend is unreachable.
    async fn is_available(&self) -> bool;

    /// Get model name for logging
    fn model_name(&self) -> &str;

    /// Estimate token count for text
    ///
    /// Roughly four characters per token; implementations with real
    /// tokenizers may override.
    fn estimate_tokens(&self, text: &str) -> usize {
        text.chars().count().div_ceil(4)
    }
}
