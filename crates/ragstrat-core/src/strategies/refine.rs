//! Iterative refinement over context chunks
//!
//! The first chunk produces an initial answer; each later chunk rewrites
//! the previous answer. Calls are sequential in every mode since each one
//! depends on the last.

use super::chunking::{join_chunk, split_into_chunks};
use crate::config::RefineConfig;
use crate::error::{RagStratError, Result};
use crate::llm::{Gateway, TextStream};
use crate::templates::{render, PromptTemplates};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RefineResult {
    pub question: String,
    /// Answer after each step, in order
    pub iterations: Vec<String>,
    pub final_answer: String,
}

pub struct RefineRunner {
    gateway: Arc<Gateway>,
    templates: Arc<PromptTemplates>,
    config: RefineConfig,
}

impl RefineRunner {
    pub fn new(gateway: Arc<Gateway>, templates: Arc<PromptTemplates>) -> Self {
        Self::with_config(gateway, templates, RefineConfig::default())
    }

    pub fn with_config(
        gateway: Arc<Gateway>,
        templates: Arc<PromptTemplates>,
        config: RefineConfig,
    ) -> Self {
        Self {
            gateway,
            templates,
            config,
        }
    }

    pub fn config(&self) -> &RefineConfig {
        &self.config
    }

    /// Refine an answer across at most `iteration_count` chunks of `context`
    ///
    /// `iteration_count` falls back to the configured value. Fewer context
    /// items than iterations means one iteration per item; empty context
    /// still makes the initial call.
    pub fn run(
        &self,
        question: &str,
        context: &[String],
        iteration_count: Option<usize>,
    ) -> Result<String> {
        Ok(self
            .run_detailed(question, context, iteration_count)?
            .final_answer)
    }

    pub fn run_detailed(
        &self,
        question: &str,
        context: &[String],
        iteration_count: Option<usize>,
    ) -> Result<RefineResult> {
        let chunks = self.plan(context, iteration_count)?;
        let mut iterations: Vec<String> = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = self.step_prompt(question, iterations.last(), chunk);
            info!("Refine: iteration {}/{}", i + 1, chunks.len());
            let answer = self.gateway.ask(&prompt)?;
            debug!("Refine: iteration {} answer is {} chars", i + 1, answer.chars().count());
            iterations.push(answer);
        }

        Ok(Self::finish(question, iterations))
    }

    pub async fn run_async(
        &self,
        question: &str,
        context: &[String],
        iteration_count: Option<usize>,
    ) -> Result<String> {
        Ok(self
            .run_detailed_async(question, context, iteration_count)
            .await?
            .final_answer)
    }

    pub async fn run_detailed_async(
        &self,
        question: &str,
        context: &[String],
        iteration_count: Option<usize>,
    ) -> Result<RefineResult> {
        let chunks = self.plan(context, iteration_count)?;
        let mut iterations: Vec<String> = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            let prompt = self.step_prompt(question, iterations.last(), chunk);
            info!("Refine: iteration {}/{}", i + 1, chunks.len());
            let answer = self.gateway.ask_async(&prompt).await?;
            iterations.push(answer);
        }

        Ok(Self::finish(question, iterations))
    }

    /// Like [`run_async`](Self::run_async), but the last iteration is streamed
    pub async fn run_stream_async(
        &self,
        question: &str,
        context: &[String],
        iteration_count: Option<usize>,
    ) -> Result<TextStream> {
        let chunks = self.plan(context, iteration_count)?;
        let Some((last, earlier)) = chunks.split_last() else {
            return Err(RagStratError::InvalidInput(
                "refine produced no iterations".to_string(),
            ));
        };

        let mut previous: Option<String> = None;
        for (i, chunk) in earlier.iter().enumerate() {
            let prompt = self.step_prompt(question, previous.as_ref(), chunk);
            info!("Refine: iteration {}/{}", i + 1, chunks.len());
            previous = Some(self.gateway.ask_async(&prompt).await?);
        }

        info!("Refine: streaming iteration {}/{}", chunks.len(), chunks.len());
        let prompt = self.step_prompt(question, previous.as_ref(), last);
        self.gateway
            .complete_stream_async(self.gateway.build_messages(&prompt, None))
            .await
    }

    /// Joined chunk text per iteration; never empty
    fn plan(&self, context: &[String], iteration_count: Option<usize>) -> Result<Vec<String>> {
        let iteration_count = iteration_count.unwrap_or(self.config.iteration_count);
        if iteration_count == 0 {
            return Err(RagStratError::InvalidInput(
                "iteration_count must be at least 1".to_string(),
            ));
        }

        let chunks: Vec<String> = split_into_chunks(context, iteration_count)
            .into_iter()
            .map(join_chunk)
            .collect();

        if chunks.is_empty() {
            debug!("Refine: empty context, single initial iteration");
            return Ok(vec![String::new()]);
        }
        Ok(chunks)
    }

    fn step_prompt(&self, question: &str, existing: Option<&String>, chunk: &str) -> String {
        match existing {
            None => render(
                &self.templates.refine.initial,
                &[("context", chunk), ("question", question)],
            ),
            Some(existing) => render(
                &self.templates.refine.refine,
                &[
                    ("question", question),
                    ("existing_answer", existing),
                    ("context", chunk),
                ],
            ),
        }
    }

    fn finish(question: &str, iterations: Vec<String>) -> RefineResult {
        RefineResult {
            question: question.to_string(),
            final_answer: iterations.last().cloned().unwrap_or_default(),
            iterations,
        }
    }
}
