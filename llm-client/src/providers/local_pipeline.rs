//! Local inference pipeline provider
//!
//! Runs generation in-process against a locally loaded model. The model is
//! loaded once, when the provider is built, and owned by the provider until
//! it is dropped.

use async_trait::async_trait;
use std::sync::Arc;

use crate::config::DEFAULT_MAX_TOKENS;
use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

const BACKEND_NAME: &str = "Hugging Face";

/// A loaded text-generation model.
///
/// `generate` blocks the calling thread; the provider moves calls onto the
/// blocking pool.
pub trait TextGenerator: Send + Sync {
    /// Generate a continuation of `prompt`, limited to `max_length` tokens
    /// (prompt included). With `truncation`, over-long prompts are cut to fit.
    fn generate(&self, prompt: &str, max_length: u32, truncation: bool) -> Result<String>;
}

/// Provider backed by a local text-generation pipeline
pub struct LocalPipelineProvider {
    model: Option<String>,
    generator: Option<Arc<dyn TextGenerator>>,
}

impl LocalPipelineProvider {
    /// Load the pipeline for `model`.
    ///
    /// Without a model the provider is still created, but every request fails
    /// with [`LlmError::BackendNotInitialized`].
    pub fn load(model: Option<&str>) -> Result<Self> {
        let model = model.map(str::trim).filter(|m| !m.is_empty());

        let Some(model) = model else {
            log::warn!("No model given for {} backend; requests will fail", BACKEND_NAME);
            return Ok(Self {
                model: None,
                generator: None,
            });
        };

        log::info!("Loading text-generation pipeline for {}", model);
        let generator = load_generator(model)?;

        Ok(Self::with_generator(model, generator))
    }

    /// Wrap an already loaded generator
    pub fn with_generator(model: &str, generator: Arc<dyn TextGenerator>) -> Self {
        Self {
            model: Some(model.to_string()),
            generator: Some(generator),
        }
    }
}

#[cfg(feature = "huggingface")]
fn load_generator(model: &str) -> Result<Arc<dyn TextGenerator>> {
    Ok(Arc::new(super::huggingface::HfPipeline::load(model)?))
}

#[cfg(not(feature = "huggingface"))]
fn load_generator(model: &str) -> Result<Arc<dyn TextGenerator>> {
    Err(LlmError::ProviderUnavailable(format!(
        "cannot load {}: built without the `huggingface` feature",
        model
    )))
}

#[async_trait]
impl LlmProvider for LocalPipelineProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let generator = self
            .generator
            .clone()
            .ok_or_else(|| LlmError::BackendNotInitialized(BACKEND_NAME.to_string()))?;

        let max_length = request.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS);
        let prompt = request.prompt;

        // Run in a blocking task to not block the tokio runtime
        let content = tokio::task::spawn_blocking(move || {
            generator.generate(&prompt, max_length, true)
        })
        .await
        .map_err(|e| LlmError::Pipeline(format!("Task join error: {}", e)))??;

        Ok(LlmResponse {
            content,
            model: self.model.clone().unwrap_or_default(),
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        BACKEND_NAME
    }

    fn is_available(&self) -> Result<()> {
        match self.generator {
            Some(_) => Ok(()),
            None => Err(LlmError::BackendNotInitialized(BACKEND_NAME.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    /// Echoes the prompt and records the generation arguments
    #[derive(Default)]
    struct EchoGenerator {
        calls: Mutex<Vec<(String, u32, bool)>>,
    }

    impl TextGenerator for EchoGenerator {
        fn generate(&self, prompt: &str, max_length: u32, truncation: bool) -> Result<String> {
            self.calls
                .lock()
                .unwrap()
                .push((prompt.to_string(), max_length, truncation));
            Ok(format!("{} 25", prompt))
        }
    }

    struct FailingGenerator;

    impl TextGenerator for FailingGenerator {
        fn generate(&self, _prompt: &str, _max_length: u32, _truncation: bool) -> Result<String> {
            Err(LlmError::Pipeline("CUDA out of memory".to_string()))
        }
    }

    #[tokio::test]
    async fn test_generate_passes_limits() {
        let generator = Arc::new(EchoGenerator::default());
        let provider = LocalPipelineProvider::with_generator("gpt2", generator.clone());
        assert!(provider.is_available().is_ok());

        let response = provider
            .complete(LlmRequest::new("square of 5 is").with_max_tokens(30))
            .await
            .unwrap();

        assert_eq!(response.content, "square of 5 is 25");
        assert_eq!(response.model, "gpt2");
        assert_eq!(
            *generator.calls.lock().unwrap(),
            vec![("square of 5 is".to_string(), 30, true)]
        );
    }

    #[tokio::test]
    async fn test_default_max_length() {
        let generator = Arc::new(EchoGenerator::default());
        let provider = LocalPipelineProvider::with_generator("gpt2", generator.clone());

        provider.complete(LlmRequest::new("hi")).await.unwrap();
        assert_eq!(generator.calls.lock().unwrap()[0].1, DEFAULT_MAX_TOKENS);
    }

    #[tokio::test]
    async fn test_missing_model_is_not_initialized() {
        for model in [None, Some(""), Some("   ")] {
            let provider = LocalPipelineProvider::load(model).unwrap();
            assert!(matches!(
                provider.is_available(),
                Err(LlmError::BackendNotInitialized(_))
            ));

            let err = provider.complete(LlmRequest::new("hi")).await.unwrap_err();
            assert!(matches!(err, LlmError::BackendNotInitialized(_)));
        }
    }

    #[tokio::test]
    async fn test_generator_error_propagates() {
        let provider = LocalPipelineProvider::with_generator("gpt2", Arc::new(FailingGenerator));
        let err = provider.complete(LlmRequest::new("hi")).await.unwrap_err();
        assert!(err.to_string().contains("CUDA out of memory"));
    }

    #[cfg(not(feature = "huggingface"))]
    #[test]
    fn test_load_without_feature() {
        let result = LocalPipelineProvider::load(Some("gpt2"));
        assert!(matches!(result, Err(LlmError::ProviderUnavailable(_))));
    }
}
