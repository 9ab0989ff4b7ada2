//! OpenAI completions API provider
//!
//! Sends the prompt as-is to the legacy `/completions` endpoint, which takes a
//! raw prompt string rather than chat messages.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::error::{LlmError, Result};
use crate::provider::{LlmProvider, LlmRequest, LlmResponse, TokenUsage};

pub const OPENAI_API_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_COMPLETION_MODEL: &str = "gpt-3.5-turbo-instruct";

/// Provider for the OpenAI completions API
pub struct OpenAiProvider {
    model: String,
    base_url: String,
    api_key: String,
    client: Client,
}

impl OpenAiProvider {
    /// Create a new OpenAI provider
    ///
    /// `model` defaults to [`DEFAULT_COMPLETION_MODEL`], `base_url` to the
    /// public API.
    pub fn new(model: Option<&str>, api_key: String, base_url: Option<&str>) -> Result<Self> {
        let client = Client::new();

        Ok(Self {
            model: model.unwrap_or(DEFAULT_COMPLETION_MODEL).to_string(),
            base_url: base_url
                .unwrap_or(OPENAI_API_URL)
                .trim_end_matches('/')
                .to_string(),
            api_key,
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

// OpenAI API request/response types

#[derive(Debug, Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<Choice>,
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    text: String,
}

#[derive(Debug, Deserialize)]
struct Usage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ApiError,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl LlmProvider for OpenAiProvider {
    async fn complete(&self, request: LlmRequest) -> Result<LlmResponse> {
        let api_request = CompletionRequest {
            model: &self.model,
            prompt: &request.prompt,
            max_tokens: request.max_tokens,
        };

        let url = format!("{}/completions", self.base_url);
        log::debug!("POST {} (model {})", url, self.model);

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&api_request)
            .send()
            .await
            .map_err(|e| LlmError::ApiError {
                message: format!("Request failed: {}", e),
                status_code: None,
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            let message =
                if let Ok(error_response) = serde_json::from_str::<ErrorResponse>(&error_text) {
                    error_response.error.message
                } else {
                    error_text
                };

            return Err(LlmError::ApiError {
                message,
                status_code: Some(status.as_u16()),
            });
        }

        let api_response: CompletionResponse =
            response.json().await.map_err(|e| LlmError::ApiError {
                message: format!("Failed to parse response: {}", e),
                status_code: None,
            })?;

        let content = api_response
            .choices
            .first()
            .map(|c| c.text.trim().to_string())
            .ok_or_else(|| LlmError::ApiError {
                message: "Response contained no choices".to_string(),
                status_code: None,
            })?;

        let usage = api_response.usage.map(|u| TokenUsage {
            input_tokens: u.prompt_tokens,
            output_tokens: u.completion_tokens,
        });

        Ok(LlmResponse {
            content,
            model: self.model.clone(),
            usage,
        })
    }

    fn name(&self) -> &'static str {
        "OpenAI"
    }

    fn is_available(&self) -> Result<()> {
        // API key was provided in constructor
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider_for(server: &MockServer) -> OpenAiProvider {
        OpenAiProvider::new(None, "sk-test".to_string(), Some(&server.uri())).unwrap()
    }

    #[test]
    fn test_defaults() {
        let provider = OpenAiProvider::new(None, "sk".to_string(), None).unwrap();
        assert_eq!(provider.model(), DEFAULT_COMPLETION_MODEL);
        assert_eq!(provider.base_url, OPENAI_API_URL);

        let provider =
            OpenAiProvider::new(Some("davinci-002"), "sk".to_string(), Some("http://x/v1/"))
                .unwrap();
        assert_eq!(provider.model(), "davinci-002");
        assert_eq!(provider.base_url, "http://x/v1");
    }

    #[tokio::test]
    async fn test_complete_success() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completions"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_partial_json(json!({
                "model": DEFAULT_COMPLETION_MODEL,
                "prompt": "Given the salary of 2, what is the square of the salary?",
                "max_tokens": 50
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"text": "\n\n4\n"}],
                "usage": {"prompt_tokens": 12, "completion_tokens": 1}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let request =
            LlmRequest::new("Given the salary of 2, what is the square of the salary?")
                .with_max_tokens(50);
        let response = provider_for(&server).complete(request).await.unwrap();

        assert_eq!(response.content, "4");
        let usage = response.usage.unwrap();
        assert_eq!(usage.input_tokens, 12);
        assert_eq!(usage.output_tokens, 1);
    }

    #[tokio::test]
    async fn test_complete_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"message": "Incorrect API key provided"}
            })))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(LlmRequest::new("hi"))
            .await
            .unwrap_err();

        match err {
            LlmError::ApiError {
                message,
                status_code,
            } => {
                assert_eq!(message, "Incorrect API key provided");
                assert_eq!(status_code, Some(401));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_complete_without_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
            .mount(&server)
            .await;

        let err = provider_for(&server)
            .complete(LlmRequest::new("hi"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no choices"));
    }
}
