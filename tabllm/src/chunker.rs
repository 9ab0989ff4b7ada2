//! Token-budget packing of prompts into request chunks.

use crate::tokens::estimate;

/// Separator between prompts inside a chunk
pub const PROMPT_SEPARATOR: &str = "\n";

/// An ordered group of prompts sent as one request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    prompts: Vec<String>,
    tokens: usize,
}

impl Chunk {
    fn new(prompt: String) -> Self {
        let tokens = estimate(&prompt);
        Self {
            prompts: vec![prompt],
            tokens,
        }
    }

    /// The prompts in this chunk, in input order
    pub fn prompts(&self) -> &[String] {
        &self.prompts
    }

    /// Accumulated token estimate
    pub fn tokens(&self) -> usize {
        self.tokens
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }

    /// The request text: prompts joined by newlines
    pub fn text(&self) -> String {
        self.prompts.join(PROMPT_SEPARATOR)
    }
}

/// Pack prompts, in order, into as few chunks as possible such that each
/// chunk's token estimate stays within `budget`.
///
/// Greedy single pass: a prompt joins the current chunk if it still fits,
/// otherwise the current chunk is closed and the prompt starts a new one. A
/// prompt that alone exceeds the budget gets a chunk of its own; rejecting it
/// is up to the caller.
pub fn pack<I, S>(prompts: I, budget: usize) -> Vec<Chunk>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut chunks = Vec::new();
    let mut current: Option<Chunk> = None;

    for prompt in prompts {
        let prompt = prompt.into();
        let tokens = estimate(&prompt);

        match current.as_mut() {
            Some(chunk) if chunk.tokens + tokens <= budget => {
                chunk.prompts.push(prompt);
                chunk.tokens += tokens;
            }
            _ => {
                // Flush and start a new chunk
                if let Some(full) = current.replace(Chunk::new(prompt)) {
                    chunks.push(full);
                }
            }
        }
    }

    // Don't forget the last chunk
    if let Some(last) = current {
        chunks.push(last);
    }

    chunks
}
