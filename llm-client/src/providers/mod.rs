//! LLM provider implementations

#[cfg(feature = "huggingface")]
mod huggingface;
mod local_pipeline;
pub mod mock;
mod openai;

#[cfg(feature = "huggingface")]
pub use huggingface::HfPipeline;
pub use local_pipeline::{LocalPipelineProvider, TextGenerator};
pub use mock::MockProvider;
pub use openai::{DEFAULT_COMPLETION_MODEL, OPENAI_API_URL, OpenAiProvider};

use std::fmt;
use std::str::FromStr;

use crate::config::{ModelPreset, ProviderConfig};
use crate::error::{LlmError, Result};
use crate::provider::LlmProvider;

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderKind {
    /// Remote completion API
    OpenAi,
    /// Local inference pipeline
    HuggingFace,
}

impl FromStr for ProviderKind {
    type Err = LlmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "huggingface" | "hugging-face" | "hf" => Ok(Self::HuggingFace),
            _ => Err(LlmError::UnsupportedProvider(s.to_string())),
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::HuggingFace => write!(f, "huggingface"),
        }
    }
}

impl ProviderKind {
    /// Get the environment variable name for this provider's API key
    pub fn env_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some("OPENAI_API_KEY"),
            Self::HuggingFace => None,
        }
    }
}

/// Create a provider instance from a preset and optional config
///
/// The local pipeline is loaded here, before any request is made.
pub fn get_provider(
    preset: &ModelPreset,
    provider_config: Option<&ProviderConfig>,
) -> Result<Box<dyn LlmProvider>> {
    let kind: ProviderKind = preset.provider.parse()?;

    match kind {
        ProviderKind::OpenAi => {
            let api_key = get_api_key(provider_config, kind)?;
            let base_url = provider_config.and_then(|c| c.base_url.as_deref());
            Ok(Box::new(OpenAiProvider::new(
                preset.model.as_deref(),
                api_key,
                base_url,
            )?))
        }
        ProviderKind::HuggingFace => Ok(Box::new(LocalPipelineProvider::load(
            preset.model.as_deref(),
        )?)),
    }
}

/// Get API key from config or the provider's environment variable
fn get_api_key(config: Option<&ProviderConfig>, kind: ProviderKind) -> Result<String> {
    // Check config first
    if let Some(key) = config.and_then(|c| c.api_key.clone()) {
        return Ok(key);
    }

    let env_var = kind.env_var().ok_or_else(|| {
        LlmError::ConfigError(format!("no api_key in [providers.{}]", kind))
    })?;
    std::env::var(env_var).map_err(|_| LlmError::MissingApiKey {
        provider: kind.to_string(),
        env_var: env_var.to_string(),
    })
}
