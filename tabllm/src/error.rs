use llm_client::LlmError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid input shape: {0}. Pass a table (array of objects) or a single column (array of values)")]
    InvalidInputShape(String),

    #[error("Invalid template at byte {position}: {reason}")]
    InvalidTemplate { position: usize, reason: String },

    #[error("Template references field '{0}', which the record doesn't have")]
    MissingField(String),

    #[error("Template mismatch: {0}")]
    TemplateMismatch(String),

    #[error("Total prompt exceeds the maximum token limit ({tokens} > {max_tokens})")]
    PromptTooLarge { tokens: usize, max_tokens: usize },

    #[error("Provider error: {0}")]
    Provider(#[from] LlmError),
}

pub type Result<T> = std::result::Result<T, Error>;
