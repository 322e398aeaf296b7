//! Map-Reduce over context chunks
//!
//! Each chunk is answered independently (map), then the labelled partial
//! answers are merged by one more call (reduce). In async mode map calls
//! run concurrently up to `max_concurrent_requests`.

use super::chunking::{join_chunk, split_into_chunks};
use crate::config::MapReduceConfig;
use crate::error::{RagStratError, Result};
use crate::llm::{Gateway, TextStream};
use crate::templates::{render, PromptTemplates};
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MapReduceResult {
    pub question: String,
    pub chunk_sizes: Vec<usize>,
    /// Map answers in chunk order
    pub partial_answers: Vec<String>,
    pub final_answer: String,
}

/// How a context would be split, without calling the model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SplitStats {
    pub total_items: usize,
    pub chunk_count: usize,
    pub chunk_sizes: Vec<usize>,
    pub average_chunk_size: f64,
    pub max_concurrent_requests: usize,
    /// Chunks that can be in flight at once
    pub estimated_speedup: usize,
}

/// Split `context` into at most `chunk_count` contiguous groups
pub fn split_context(context: &[String], chunk_count: usize) -> Result<Vec<&[String]>> {
    if chunk_count == 0 {
        return Err(RagStratError::InvalidInput(
            "chunk_count must be at least 1".to_string(),
        ));
    }
    Ok(split_into_chunks(context, chunk_count))
}

pub struct MapReduceRunner {
    gateway: Arc<Gateway>,
    templates: Arc<PromptTemplates>,
    config: MapReduceConfig,
}

impl MapReduceRunner {
    pub fn new(gateway: Arc<Gateway>, templates: Arc<PromptTemplates>) -> Self {
        Self::with_config(gateway, templates, MapReduceConfig::default())
    }

    pub fn with_config(
        gateway: Arc<Gateway>,
        templates: Arc<PromptTemplates>,
        config: MapReduceConfig,
    ) -> Self {
        Self {
            gateway,
            templates,
            config,
        }
    }

    pub fn config(&self) -> &MapReduceConfig {
        &self.config
    }

    pub fn split_stats(
        &self,
        context: &[String],
        chunk_count: Option<usize>,
    ) -> Result<SplitStats> {
        let chunk_count = chunk_count.unwrap_or(self.config.chunk_count);
        let chunk_sizes: Vec<usize> = split_context(context, chunk_count)?
            .iter()
            .map(|c| c.len())
            .collect();

        let average_chunk_size = if chunk_sizes.is_empty() {
            0.0
        } else {
            chunk_sizes.iter().sum::<usize>() as f64 / chunk_sizes.len() as f64
        };

        Ok(SplitStats {
            total_items: context.len(),
            chunk_count: chunk_sizes.len(),
            estimated_speedup: chunk_sizes.len().min(self.concurrency()),
            chunk_sizes,
            average_chunk_size,
            max_concurrent_requests: self.concurrency(),
        })
    }

    /// Sequential map, then reduce
    ///
    /// `chunk_count` falls back to the configured value.
    pub fn run(
        &self,
        question: &str,
        context: &[String],
        chunk_count: Option<usize>,
    ) -> Result<String> {
        Ok(self.run_detailed(question, context, chunk_count)?.final_answer)
    }

    pub fn run_detailed(
        &self,
        question: &str,
        context: &[String],
        chunk_count: Option<usize>,
    ) -> Result<MapReduceResult> {
        let chunks = self.chunks(context, chunk_count)?;
        info!("Map-Reduce: mapping {} chunks sequentially", chunks.len());

        let mut partial_answers = Vec::with_capacity(chunks.len());
        for (idx, chunk) in chunks.iter().enumerate() {
            debug!("Map-Reduce: chunk {}/{}", idx + 1, chunks.len());
            partial_answers.push(self.gateway.ask(&self.map_prompt(question, idx, chunk))?);
        }

        info!("Map-Reduce: reducing {} partial answers", partial_answers.len());
        let final_answer = self
            .gateway
            .ask(&self.reduce_prompt(question, &partial_answers))?;

        Ok(MapReduceResult {
            question: question.to_string(),
            chunk_sizes: chunks.iter().map(|c| c.len()).collect(),
            partial_answers,
            final_answer,
        })
    }

    /// Concurrent map, then reduce
    pub async fn run_async(
        &self,
        question: &str,
        context: &[String],
        chunk_count: Option<usize>,
    ) -> Result<String> {
        Ok(self
            .run_detailed_async(question, context, chunk_count)
            .await?
            .final_answer)
    }

    pub async fn run_detailed_async(
        &self,
        question: &str,
        context: &[String],
        chunk_count: Option<usize>,
    ) -> Result<MapReduceResult> {
        let chunks = self.chunks(context, chunk_count)?;
        let partial_answers = self.map_async(question, &chunks).await?;

        info!("Map-Reduce: reducing {} partial answers", partial_answers.len());
        let final_answer = self
            .gateway
            .ask_async(&self.reduce_prompt(question, &partial_answers))
            .await?;

        Ok(MapReduceResult {
            question: question.to_string(),
            chunk_sizes: chunks.iter().map(|c| c.len()).collect(),
            partial_answers,
            final_answer,
        })
    }

    /// Concurrent map, then a streamed reduce
    pub async fn run_stream_async(
        &self,
        question: &str,
        context: &[String],
        chunk_count: Option<usize>,
    ) -> Result<TextStream> {
        let chunks = self.chunks(context, chunk_count)?;
        let partial_answers = self.map_async(question, &chunks).await?;

        info!("Map-Reduce: streaming reduce over {} partial answers", partial_answers.len());
        let prompt = self.reduce_prompt(question, &partial_answers);
        self.gateway
            .complete_stream_async(self.gateway.build_messages(&prompt, None))
            .await
    }

    fn concurrency(&self) -> usize {
        self.config.max_concurrent_requests.max(1)
    }

    fn chunks<'a>(
        &self,
        context: &'a [String],
        chunk_count: Option<usize>,
    ) -> Result<Vec<&'a [String]>> {
        split_context(context, chunk_count.unwrap_or(self.config.chunk_count))
    }

    /// Map answers in chunk order regardless of completion order
    async fn map_async(&self, question: &str, chunks: &[&[String]]) -> Result<Vec<String>> {
        let total = chunks.len();
        let concurrent = self.concurrency();
        info!(
            "Map-Reduce: mapping {} chunks ({} concurrent)",
            total, concurrent
        );

        let results: Vec<_> = stream::iter(chunks.iter())
            .enumerate()
            .map(|(idx, chunk)| async move {
                debug!("Map-Reduce: chunk {}/{}", idx + 1, total);
                let prompt = self.map_prompt(question, idx, chunk);
                (idx, self.gateway.ask_async(&prompt).await)
            })
            .buffer_unordered(concurrent)
            .collect()
            .await;

        let mut sorted = results;
        sorted.sort_by_key(|(idx, _)| *idx);

        sorted.into_iter().map(|(_, answer)| answer).collect()
    }

    fn map_prompt(&self, question: &str, idx: usize, chunk: &[String]) -> String {
        let chunk_index = (idx + 1).to_string();
        let context = join_chunk(chunk);
        render(
            &self.templates.map_reduce.map,
            &[
                ("chunk_index", &chunk_index),
                ("context", &context),
                ("question", question),
            ],
        )
    }

    fn reduce_prompt(&self, question: &str, partial_answers: &[String]) -> String {
        let map_results = label_partial_answers(partial_answers);
        render(
            &self.templates.map_reduce.reduce,
            &[("question", question), ("map_results", &map_results)],
        )
    }
}

/// "片段{i}的回答" blocks in chunk order
fn label_partial_answers(partial_answers: &[String]) -> String {
    partial_answers
        .iter()
        .enumerate()
        .map(|(i, answer)| format!("片段{}的回答:\n{}", i + 1, answer))
        .collect::<Vec<_>>()
        .join("\n\n")
}
