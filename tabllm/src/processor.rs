//! Batch processing strategies over a single gateway.
//!
//! The three strategies are not interchangeable: only [`Strategy::Rows`]
//! returns one result per input record. [`Strategy::OneChunk`] returns a
//! single result for the whole input, and [`Strategy::Chunks`] one result per
//! packed chunk.

use clap::ValueEnum;
use llm_client::Gateway;
use serde::Serialize;

use crate::chunker::{PROMPT_SEPARATOR, pack};
use crate::error::{Error, Result};
use crate::prompt::PromptTemplate;
use crate::record::{Input, IntoInput};
use crate::tokens::estimate;

/// How records are turned into requests
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Strategy {
    /// One request per record
    Rows,
    /// All prompts joined into a single request
    OneChunk,
    /// Prompts packed into as few requests as the token budget allows
    Chunks,
}

/// Results, shaped by the strategy that produced them
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Output {
    /// One result per input record, in input order
    Rows(Vec<String>),
    /// One result for the whole input
    Single(String),
    /// One result per chunk, in chunk order
    Chunks(Vec<String>),
}

impl Output {
    /// Flatten into a list of results
    pub fn into_vec(self) -> Vec<String> {
        match self {
            Self::Rows(results) | Self::Chunks(results) => results,
            Self::Single(result) => vec![result],
        }
    }
}

/// A request that would be sent, with its token estimate
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedRequest {
    pub prompt: String,
    pub tokens: usize,
}

/// Render and group prompts for `strategy` without sending anything.
///
/// Fails the same way processing would before its first request.
pub fn plan<I: IntoInput>(
    strategy: Strategy,
    template: &PromptTemplate,
    input: I,
    max_tokens: usize,
) -> Result<Vec<PlannedRequest>> {
    let prompts = render_all(template, input.into_input()?)?;

    let planned = match strategy {
        Strategy::Rows => prompts
            .into_iter()
            .map(|prompt| PlannedRequest {
                tokens: estimate(&prompt),
                prompt,
            })
            .collect(),
        Strategy::OneChunk => vec![join_within_budget(&prompts, max_tokens)?],
        Strategy::Chunks => pack(prompts, max_tokens)
            .into_iter()
            .map(|chunk| PlannedRequest {
                prompt: chunk.text(),
                tokens: chunk.tokens(),
            })
            .collect(),
    };
    Ok(planned)
}

fn render_all(template: &PromptTemplate, input: Input) -> Result<Vec<String>> {
    input
        .into_records()
        .iter()
        .map(|record| template.render(record))
        .collect()
}

fn join_within_budget(prompts: &[String], max_tokens: usize) -> Result<PlannedRequest> {
    let prompt = prompts.join(PROMPT_SEPARATOR);
    let tokens = estimate(&prompt);
    if tokens > max_tokens {
        return Err(Error::PromptTooLarge { tokens, max_tokens });
    }
    Ok(PlannedRequest { prompt, tokens })
}

/// Formats records with a template and sends them through a gateway
///
/// Requests are sent one at a time, in input order. The first failed request
/// aborts the call; results already received are dropped.
pub struct BatchProcessor {
    gateway: Gateway,
    template: PromptTemplate,
}

impl BatchProcessor {
    pub fn new(gateway: Gateway, template: PromptTemplate) -> Self {
        Self { gateway, template }
    }

    pub fn gateway(&self) -> &Gateway {
        &self.gateway
    }

    pub fn template(&self) -> &PromptTemplate {
        &self.template
    }

    /// Token budget per request, taken from the gateway
    pub fn max_tokens(&self) -> usize {
        self.gateway.max_tokens() as usize
    }

    /// Run `input` through `strategy`
    pub async fn process<I: IntoInput>(&self, strategy: Strategy, input: I) -> Result<Output> {
        match strategy {
            Strategy::Rows => self.process_row_by_row(input).await.map(Output::Rows),
            Strategy::OneChunk => self.process_in_one_big_chunk(input).await.map(Output::Single),
            Strategy::Chunks => self.process_in_chunks(input).await.map(Output::Chunks),
        }
    }

    /// One request per record; results match input order 1:1
    pub async fn process_row_by_row<I: IntoInput>(&self, input: I) -> Result<Vec<String>> {
        let prompts = render_all(&self.template, input.into_input()?)?;
        log::info!(
            "Processing {} record(s) row by row via {}",
            prompts.len(),
            self.gateway.provider_name()
        );

        self.query_each(prompts.iter().map(String::as_str)).await
    }

    /// A single request holding every prompt
    ///
    /// Fails with [`Error::PromptTooLarge`] before sending anything when the
    /// joined prompt is over budget.
    pub async fn process_in_one_big_chunk<I: IntoInput>(&self, input: I) -> Result<String> {
        let prompts = render_all(&self.template, input.into_input()?)?;
        let request = join_within_budget(&prompts, self.max_tokens())?;
        log::info!(
            "Processing {} record(s) as one chunk of ~{} tokens via {}",
            prompts.len(),
            request.tokens,
            self.gateway.provider_name()
        );

        Ok(self.gateway.query(&request.prompt).await?)
    }

    /// One request per packed chunk; results are per chunk, not per record
    pub async fn process_in_chunks<I: IntoInput>(&self, input: I) -> Result<Vec<String>> {
        let prompts = render_all(&self.template, input.into_input()?)?;
        let record_count = prompts.len();
        let chunks = pack(prompts, self.max_tokens());
        log::info!(
            "Processing {} record(s) in {} chunk(s) via {}",
            record_count,
            chunks.len(),
            self.gateway.provider_name()
        );

        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.tokens() > self.max_tokens() {
                log::warn!(
                    "Chunk {} is a single prompt of ~{} tokens, over the {} token budget",
                    i,
                    chunk.tokens(),
                    self.max_tokens()
                );
            }
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text()).collect();
        self.query_each(texts.iter().map(String::as_str)).await
    }

    async fn query_each<'a>(&self, prompts: impl Iterator<Item = &'a str>) -> Result<Vec<String>> {
        let mut results = Vec::new();
        for (i, prompt) in prompts.enumerate() {
            log::debug!("Request {}: ~{} tokens", i, estimate(prompt));
            results.push(self.gateway.query(prompt).await?);
        }
        Ok(results)
    }
}
