//! tabllm - format tabular data into prompts and run them through an LLM
//!
//! Records are rendered with a [`PromptTemplate`], then sent through a
//! [`llm_client::Gateway`] using one of three [`Strategy`]s: one request per
//! row, one request for everything, or requests packed up to the gateway's
//! token budget.

pub mod chunker;
pub mod error;
pub mod processor;
pub mod prompt;
pub mod record;
pub mod tokens;

pub use chunker::{Chunk, pack};
pub use error::{Error, Result};
pub use processor::{BatchProcessor, Output, PlannedRequest, Strategy, plan};
pub use prompt::{Placeholder, PromptTemplate};
pub use record::{Input, IntoInput, Record};
pub use tokens::estimate;
