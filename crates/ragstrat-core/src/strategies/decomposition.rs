//! Query decomposition
//!
//! Split a complex question into sub-questions, answer each one over its
//! own context, then summarize. A failing sub-question is recorded as a
//! placeholder answer and never aborts the run.

use crate::config::DecompositionConfig;
use crate::error::Result;
use crate::llm::Gateway;
use crate::retrieval::{BlockingRetriever, Retriever};
use crate::templates::{render, PromptTemplates};
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Prefix of the answer recorded for a sub-question that failed
pub const SUB_QUERY_ERROR_PREFIX: &str = "处理该子问题时出现错误: ";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubQuery {
    pub id: usize,
    pub question: String,
    pub focus: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubAnswer {
    pub question: String,
    pub focus: String,
    pub answer: String,
    /// Context items the answer was grounded on
    pub context_used: usize,
    pub failed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecompositionResult {
    pub question: String,
    pub sub_answers: Vec<SubAnswer>,
    pub final_answer: String,
}

/// Extract sub-questions from a decomposition response
///
/// Parses the text between the first `{` and the last `}`. Anything
/// unusable yields a single sub-question equal to `question`.
pub fn parse_decomposition(response: &str, question: &str) -> Vec<SubQuery> {
    let fallback = || {
        vec![SubQuery {
            id: 1,
            question: question.to_string(),
            focus: String::new(),
        }]
    };

    let json_str = match (response.find('{'), response.rfind('}')) {
        (Some(start), Some(end)) if start < end => &response[start..=end],
        _ => {
            warn!("Decomposition response has no JSON object, answering the question directly");
            debug!("Raw LLM response: {}", response);
            return fallback();
        }
    };

    let parsed: serde_json::Value = match serde_json::from_str(json_str) {
        Ok(json) => json,
        Err(e) => {
            warn!(
                "Failed to parse decomposition JSON: {}, answering the question directly",
                e
            );
            debug!("Raw LLM response: {}", response);
            return fallback();
        }
    };

    let sub_queries: Vec<SubQuery> = parsed["sub_queries"]
        .as_array()
        .map(|items| {
            items
                .iter()
                .enumerate()
                .filter_map(|(idx, item)| {
                    let text = item["question"].as_str()?.trim();
                    if text.is_empty() {
                        return None;
                    }
                    Some(SubQuery {
                        id: item["id"]
                            .as_u64()
                            .map(|id| id as usize)
                            .unwrap_or(idx + 1),
                        question: text.to_string(),
                        focus: item["focus"].as_str().unwrap_or_default().to_string(),
                    })
                })
                .collect()
        })
        .unwrap_or_default();

    if sub_queries.is_empty() {
        warn!("Decomposition returned no sub-queries, answering the question directly");
        return fallback();
    }
    sub_queries
}

pub struct QueryDecompositionRunner {
    gateway: Arc<Gateway>,
    templates: Arc<PromptTemplates>,
    config: DecompositionConfig,
}

impl QueryDecompositionRunner {
    pub fn new(gateway: Arc<Gateway>, templates: Arc<PromptTemplates>) -> Self {
        Self::with_config(gateway, templates, DecompositionConfig::default())
    }

    pub fn with_config(
        gateway: Arc<Gateway>,
        templates: Arc<PromptTemplates>,
        config: DecompositionConfig,
    ) -> Self {
        Self {
            gateway,
            templates,
            config,
        }
    }

    pub fn config(&self) -> &DecompositionConfig {
        &self.config
    }

    /// Ask the model to split `question`
    pub fn decompose(&self, question: &str) -> Result<Vec<SubQuery>> {
        let response = self.gateway.ask(&self.decompose_prompt(question))?;
        Ok(parse_decomposition(&response, question))
    }

    pub async fn decompose_async(&self, question: &str) -> Result<Vec<SubQuery>> {
        let response = self
            .gateway
            .ask_async(&self.decompose_prompt(question))
            .await?;
        Ok(parse_decomposition(&response, question))
    }

    /// Decompose, answer sub-questions one after another, then summarize
    ///
    /// With a retriever, each sub-question is answered over its own
    /// retrieval results, or `context` when retrieval comes back empty.
    pub fn run(
        &self,
        question: &str,
        context: &[String],
        retriever: Option<&dyn BlockingRetriever>,
    ) -> Result<String> {
        Ok(self.run_detailed(question, context, retriever)?.final_answer)
    }

    pub fn run_detailed(
        &self,
        question: &str,
        context: &[String],
        retriever: Option<&dyn BlockingRetriever>,
    ) -> Result<DecompositionResult> {
        let sub_queries = self.decompose(question)?;
        info!("Decomposition: {} sub-queries", sub_queries.len());

        let sub_answers: Vec<SubAnswer> = sub_queries
            .iter()
            .map(|sub| {
                let outcome = self.answer_sub_query(sub, context, retriever);
                Self::settle(sub, outcome)
            })
            .collect();

        self.finish(question, sub_answers)
    }

    /// Decompose, answer all sub-questions concurrently, then summarize
    pub async fn run_async(
        &self,
        question: &str,
        context: &[String],
        retriever: Option<&dyn Retriever>,
    ) -> Result<String> {
        Ok(self
            .run_detailed_async(question, context, retriever)
            .await?
            .final_answer)
    }

    pub async fn run_detailed_async(
        &self,
        question: &str,
        context: &[String],
        retriever: Option<&dyn Retriever>,
    ) -> Result<DecompositionResult> {
        let sub_queries = self.decompose_async(question).await?;
        info!(
            "Decomposition: answering {} sub-queries concurrently",
            sub_queries.len()
        );

        let sub_answers = join_all(sub_queries.iter().map(|sub| async move {
            let outcome = self.answer_sub_query_async(sub, context, retriever).await;
            Self::settle(sub, outcome)
        }))
        .await;

        self.finish_async(question, sub_answers).await
    }

    fn answer_sub_query(
        &self,
        sub: &SubQuery,
        context: &[String],
        retriever: Option<&dyn BlockingRetriever>,
    ) -> Result<(String, usize)> {
        let retrieved = match retriever {
            Some(retriever) => retriever.retrieve(&sub.question, self.config.retrieval_top_k)?,
            None => Vec::new(),
        };
        let (context_str, used) = choose_context(retrieved, context);
        let answer = self
            .gateway
            .ask(&self.single_query_prompt(&sub.question, &context_str))?;
        Ok((answer, used))
    }

    async fn answer_sub_query_async(
        &self,
        sub: &SubQuery,
        context: &[String],
        retriever: Option<&dyn Retriever>,
    ) -> Result<(String, usize)> {
        let retrieved = match retriever {
            Some(retriever) => {
                retriever
                    .retrieve(&sub.question, self.config.retrieval_top_k)
                    .await?
            }
            None => Vec::new(),
        };
        let (context_str, used) = choose_context(retrieved, context);
        let answer = self
            .gateway
            .ask_async(&self.single_query_prompt(&sub.question, &context_str))
            .await?;
        Ok((answer, used))
    }

    /// Turn a sub-question outcome into a record, absorbing the error
    fn settle(sub: &SubQuery, outcome: Result<(String, usize)>) -> SubAnswer {
        match outcome {
            Ok((answer, context_used)) => {
                debug!("Decomposition: sub-query {} answered", sub.id);
                SubAnswer {
                    question: sub.question.clone(),
                    focus: sub.focus.clone(),
                    answer,
                    context_used,
                    failed: false,
                }
            }
            Err(e) => {
                warn!("Decomposition: sub-query {} failed: {}", sub.id, e);
                SubAnswer {
                    question: sub.question.clone(),
                    focus: sub.focus.clone(),
                    answer: format!("{}{}", SUB_QUERY_ERROR_PREFIX, e),
                    context_used: 0,
                    failed: true,
                }
            }
        }
    }

    fn finish(&self, question: &str, sub_answers: Vec<SubAnswer>) -> Result<DecompositionResult> {
        Self::log_context_usage(&sub_answers);
        let final_answer = self
            .gateway
            .ask(&self.summarize_prompt(question, &sub_answers))?;
        Ok(DecompositionResult {
            question: question.to_string(),
            sub_answers,
            final_answer,
        })
    }

    async fn finish_async(
        &self,
        question: &str,
        sub_answers: Vec<SubAnswer>,
    ) -> Result<DecompositionResult> {
        Self::log_context_usage(&sub_answers);
        let final_answer = self
            .gateway
            .ask_async(&self.summarize_prompt(question, &sub_answers))
            .await?;
        Ok(DecompositionResult {
            question: question.to_string(),
            sub_answers,
            final_answer,
        })
    }

    fn log_context_usage(sub_answers: &[SubAnswer]) {
        let total: usize = sub_answers.iter().map(|a| a.context_used).sum();
        let failed = sub_answers.iter().filter(|a| a.failed).count();
        info!(
            "Decomposition: summarizing {} sub-answers ({} context items, {} failed)",
            sub_answers.len(),
            total,
            failed
        );
    }

    fn decompose_prompt(&self, question: &str) -> String {
        render(
            &self.templates.decomposition.decompose,
            &[("query", question)],
        )
    }

    fn single_query_prompt(&self, question: &str, context: &str) -> String {
        render(
            &self.templates.decomposition.single_query,
            &[("query", question), ("context", context)],
        )
    }

    fn summarize_prompt(&self, question: &str, sub_answers: &[SubAnswer]) -> String {
        let sub_qa_pairs = format_sub_answers(sub_answers);
        render(
            &self.templates.decomposition.summarize,
            &[("original_query", question), ("sub_qa_pairs", &sub_qa_pairs)],
        )
    }
}

/// Retrieved documents when there are any, else the default context
fn choose_context(retrieved: Vec<String>, default_context: &[String]) -> (String, usize) {
    if retrieved.is_empty() {
        (default_context.join("\n"), default_context.len())
    } else {
        (retrieved.join("\n"), retrieved.len())
    }
}

fn format_sub_answers(sub_answers: &[SubAnswer]) -> String {
    sub_answers
        .iter()
        .enumerate()
        .map(|(i, a)| {
            format!(
                "子问题{}: {}\n关注点: {}\n回答: {}\n(使用了 {} 条上下文信息)",
                i + 1,
                a.question,
                a.focus,
                a.answer,
                a.context_used
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const QUESTION: &str = "智能体和多智能体系统有什么区别？";

    #[test]
    fn test_parse_fenced_json() {
        let response = r#"好的，分解如下：
```json
{
    "original_query": "x",
    "sub_queries": [
        {"id": 1, "question": "什么是智能体？", "focus": "定义"},
        {"id": 2, "question": "什么是多智能体系统？", "focus": "组成"}
    ],
    "reasoning": "先定义再比较"
}
```"#;
        let subs = parse_decomposition(response, QUESTION);
        assert_eq!(subs.len(), 2);
        assert_eq!(subs[0].question, "什么是智能体？");
        assert_eq!(subs[1].focus, "组成");
        assert_eq!(subs[1].id, 2);
    }

    #[test]
    fn test_parse_falls_back_on_garbage() {
        for response in ["no json here", "{ broken", "{\"sub_queries\": []}", "} {"] {
            let subs = parse_decomposition(response, QUESTION);
            assert_eq!(subs.len(), 1, "response: {}", response);
            assert_eq!(subs[0].question, QUESTION);
            assert!(subs[0].focus.is_empty());
        }
    }

    #[test]
    fn test_parse_skips_items_without_question() {
        let response = r#"{"sub_queries": [{"id": 1, "focus": "x"}, {"question": "留下"}]}"#;
        let subs = parse_decomposition(response, QUESTION);
        assert_eq!(subs.len(), 1);
        assert_eq!(subs[0].question, "留下");
        assert_eq!(subs[0].id, 2);
        assert_eq!(subs[0].focus, "");
    }

    #[test]
    fn test_choose_context_prefers_retrieval() {
        let default = vec!["d1".to_string(), "d2".to_string()];
        assert_eq!(
            choose_context(vec!["r".to_string()], &default),
            ("r".to_string(), 1)
        );
        assert_eq!(choose_context(Vec::new(), &default), ("d1\nd2".to_string(), 2));
    }

    #[test]
    fn test_format_sub_answers() {
        let answers = vec![SubAnswer {
            question: "q".to_string(),
            focus: "f".to_string(),
            answer: "a".to_string(),
            context_used: 1,
            failed: false,
        }];
        assert_eq!(
            format_sub_answers(&answers),
            "子问题1: q\n关注点: f\n回答: a\n(使用了 1 条上下文信息)"
        );
    }
}
