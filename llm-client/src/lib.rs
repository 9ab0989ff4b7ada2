//! LLM backends for tabllm
//!
//! Provides one `query(prompt)` entry point over two kinds of backend:
//! - OpenAI completions API (remote)
//! - Hugging Face text-generation pipeline (local, `huggingface` feature)

pub mod config;
pub mod error;
pub mod gateway;
pub mod provider;
pub mod providers;

pub use config::{Config, DEFAULT_MAX_TOKENS, ModelPreset, ProviderConfig};
pub use error::{LlmError, Result};
pub use gateway::Gateway;
pub use provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};
pub use providers::{
    LocalPipelineProvider, MockProvider, OpenAiProvider, ProviderKind, TextGenerator, get_provider,
};
