//! Single-backend gateway: one provider, one token limit, one `query` call.

use crate::config::{Config, ModelPreset, ProviderConfig};
use crate::error::Result;
use crate::provider::{LlmProvider, LlmRequest};
use crate::providers::get_provider;

/// A configured LLM backend
///
/// The backend and its token limit are fixed for the gateway's lifetime. Any
/// resource the backend holds (e.g. a loaded local model) is released when
/// the gateway is dropped.
pub struct Gateway {
    provider: Box<dyn LlmProvider>,
    max_tokens: u32,
}

impl Gateway {
    /// Wrap an existing provider
    pub fn new(provider: Box<dyn LlmProvider>, max_tokens: u32) -> Self {
        Self {
            provider,
            max_tokens,
        }
    }

    /// Build the preset's provider
    pub fn from_preset(
        preset: &ModelPreset,
        provider_config: Option<&ProviderConfig>,
    ) -> Result<Self> {
        let provider = get_provider(preset, provider_config)?;
        log::debug!(
            "Using LLM provider: {} (model: {}, max tokens: {})",
            provider.name(),
            preset.model.as_deref().unwrap_or("default"),
            preset.max_tokens
        );
        Ok(Self::new(provider, preset.max_tokens))
    }

    /// Build `preset` with the provider credentials from `config`
    pub fn from_config(config: &Config, preset: &ModelPreset) -> Result<Self> {
        Self::from_preset(preset, config.get_provider_config(&preset.provider))
    }

    /// Token budget per request
    pub fn max_tokens(&self) -> u32 {
        self.max_tokens
    }

    /// Display name of the backend
    pub fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Send one prompt and return the generated text
    ///
    /// Backend failures are returned as-is; nothing is retried.
    pub async fn query(&self, prompt: &str) -> Result<String> {
        let request = LlmRequest::new(prompt).with_max_tokens(self.max_tokens);
        let response = self.provider.complete(request).await?;

        if let Some(usage) = &response.usage {
            log::debug!(
                "Tokens: {} in, {} out",
                usage.input_tokens,
                usage.output_tokens
            );
        }

        Ok(response.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::providers::MockProvider;
    use std::sync::Arc;

    #[tokio::test]
    async fn test_query_sends_max_tokens() {
        let mock = Arc::new(MockProvider::always_succeeds("42"));
        let gateway = Gateway::new(Box::new(mock.clone()), 128);

        assert_eq!(gateway.query("what is 6 * 7?").await.unwrap(), "42");
        assert_eq!(gateway.max_tokens(), 128);
        assert_eq!(gateway.provider_name(), "mock");

        let requests = mock.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].prompt, "what is 6 * 7?");
        assert_eq!(requests[0].max_tokens, Some(128));
    }

    #[tokio::test]
    async fn test_query_propagates_provider_error() {
        let gateway = Gateway::new(
            Box::new(MockProvider::always_fails(LlmError::ApiError {
                message: "timeout".to_string(),
                status_code: None,
            })),
            10,
        );

        let err = gateway.query("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::ApiError { message, .. } if message == "timeout"));
    }

    #[tokio::test]
    async fn test_uninitialized_local_backend_fails_at_query() {
        let preset = ModelPreset {
            provider: "huggingface".to_string(),
            model: None,
            max_tokens: 32,
        };
        let gateway = Gateway::from_preset(&preset, None).unwrap();

        let err = gateway.query("hi").await.unwrap_err();
        assert!(matches!(err, LlmError::BackendNotInitialized(_)));
    }

    #[test]
    fn test_from_config_finds_credentials_for_any_provider_spelling() {
        let mut config = Config::default();
        config.providers.insert(
            "openai".to_string(),
            ProviderConfig {
                api_key: Some("sk".to_string()),
                base_url: None,
            },
        );
        let preset = ModelPreset {
            provider: "OpenAI".to_string(),
            model: None,
            max_tokens: 64,
        };

        let gateway = Gateway::from_config(&config, &preset).unwrap();
        assert_eq!(gateway.provider_name(), "OpenAI");
        assert_eq!(gateway.max_tokens(), 64);
    }
}
