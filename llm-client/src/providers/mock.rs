//! Mock LLM provider for testing
//!
//! Records every request it receives and can be told to fail on specific
//! calls, so callers can check how many requests were made, in what order,
//! and what happens when one of them fails.

use async_trait::async_trait;
use std::ops::Range;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse};

/// What a successful call returns
enum Reply {
    /// The same text for every call
    Fixed(String),
    /// The request prompt, prefixed
    Echo(String),
}

/// A mock provider that records requests and fails on demand
pub struct MockProvider {
    /// Zero-based call numbers that fail
    fail_calls: Range<usize>,
    /// Current call count
    call_count: AtomicUsize,
    /// Error to return on failure
    fail_with: Mutex<Option<LlmError>>,
    /// Response content on success
    reply: Reply,
    /// Every request received, in order
    requests: Mutex<Vec<LlmRequest>>,
    /// Provider name for display
    name: &'static str,
}

impl MockProvider {
    fn build(fail_calls: Range<usize>, error: Option<LlmError>, reply: Reply) -> Self {
        Self {
            fail_calls,
            call_count: AtomicUsize::new(0),
            fail_with: Mutex::new(error),
            reply,
            requests: Mutex::new(Vec::new()),
            name: "mock",
        }
    }

    /// Create a provider that always succeeds with `response`
    pub fn always_succeeds(response: &str) -> Self {
        Self::build(0..0, None, Reply::Fixed(response.to_string()))
    }

    /// Create a provider that answers each prompt with `prefix` followed by the prompt
    pub fn echo(prefix: &str) -> Self {
        Self::build(0..0, None, Reply::Echo(prefix.to_string()))
    }

    /// Create a provider that always fails with the given error
    pub fn always_fails(error: LlmError) -> Self {
        Self::build(0..usize::MAX, Some(error), Reply::Fixed(String::new()))
    }

    /// Create an echo provider whose call number `n` (zero-based) fails
    pub fn fails_on_call(n: usize, error: LlmError, prefix: &str) -> Self {
        Self::build(n..n + 1, Some(error), Reply::Echo(prefix.to_string()))
    }

    /// Get the number of times complete() was called
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Prompts received so far, in call order
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|r| r.prompt.clone())
            .collect()
    }

    /// Requests received so far, in call order
    pub fn requests(&self) -> Vec<LlmRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Set a custom provider name
    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }
}

#[async_trait]
impl LlmProvider for MockProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let call_num = self.call_count.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().unwrap().push(request.clone());

        if self.fail_calls.contains(&call_num) {
            let error = self.fail_with.lock().unwrap();
            if let Some(err) = error.as_ref() {
                return Err(clone_error(err));
            }
        }

        let content = match &self.reply {
            Reply::Fixed(text) => text.clone(),
            Reply::Echo(prefix) => format!("{}{}", prefix, request.prompt),
        };

        Ok(LlmResponse {
            content,
            model: "mock-model".to_string(),
            usage: None,
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }

    fn is_available(&self) -> Result<()> {
        Ok(())
    }
}

/// Clone an LlmError (needed because LlmError doesn't implement Clone)
fn clone_error(err: &LlmError) -> LlmError {
    match err {
        LlmError::UnsupportedProvider(s) => LlmError::UnsupportedProvider(s.clone()),
        LlmError::BackendNotInitialized(s) => LlmError::BackendNotInitialized(s.clone()),
        LlmError::MissingApiKey { provider, env_var } => LlmError::MissingApiKey {
            provider: provider.clone(),
            env_var: env_var.clone(),
        },
        LlmError::ApiError {
            message,
            status_code,
        } => LlmError::ApiError {
            message: message.clone(),
            status_code: *status_code,
        },
        LlmError::Pipeline(s) => LlmError::Pipeline(s.clone()),
        LlmError::ProviderUnavailable(s) => LlmError::ProviderUnavailable(s.clone()),
        LlmError::ConfigError(s) => LlmError::ConfigError(s.clone()),
        LlmError::InvalidPreset(s) => LlmError::InvalidPreset(s.clone()),
        // For Io and Toml errors, we create a generic error since they can't be cloned
        LlmError::Io(_) => LlmError::ConfigError("IO error (mock)".to_string()),
        LlmError::TomlParse(_) => LlmError::ConfigError("TOML parse error (mock)".to_string()),
        LlmError::TomlSerialize(_) => {
            LlmError::ConfigError("TOML serialize error (mock)".to_string())
        }
    }
}
