//! Hypothetical Document Embeddings
//!
//! Generate a hypothetical answer, retrieve with it instead of the raw
//! question, then answer over the retrieved documents.

mod cache;

pub use cache::HypothesisCache;

use crate::config::HydeConfig;
use crate::error::Result;
use crate::llm::Gateway;
use crate::retrieval::{BlockingRetriever, Retriever};
use crate::templates::{render, PromptTemplates, PromptType};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

/// Everything produced by one Hyde run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HydeResult {
    pub question: String,
    pub prompt_type: PromptType,
    pub hypothetical_answer: String,
    pub retrieved_documents: Vec<String>,
    pub final_answer: String,
}

/// Direct-question retrieval next to Hyde retrieval for the same question
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineComparison {
    pub question: String,
    pub baseline_documents: Vec<String>,
    pub baseline_answer: String,
    pub hyde: HydeResult,
}

pub struct HydeRunner {
    gateway: Arc<Gateway>,
    templates: Arc<PromptTemplates>,
    config: HydeConfig,
    cache: HypothesisCache,
}

impl HydeRunner {
    pub fn new(gateway: Arc<Gateway>, templates: Arc<PromptTemplates>) -> Self {
        Self::with_config(gateway, templates, HydeConfig::default())
    }

    pub fn with_config(
        gateway: Arc<Gateway>,
        templates: Arc<PromptTemplates>,
        config: HydeConfig,
    ) -> Self {
        Self {
            gateway,
            templates,
            config,
            cache: HypothesisCache::new(),
        }
    }

    pub fn config(&self) -> &HydeConfig {
        &self.config
    }

    /// Ask the model which prompt type fits `question`
    pub fn auto_detect_prompt_type(&self, question: &str) -> Result<PromptType> {
        let prompt = self.classification_prompt(question);
        let label = self.gateway.ask(&prompt)?;
        Ok(Self::label_to_type(&label))
    }

    pub async fn auto_detect_prompt_type_async(&self, question: &str) -> Result<PromptType> {
        let prompt = self.classification_prompt(question);
        let label = self.gateway.ask_async(&prompt).await?;
        Ok(Self::label_to_type(&label))
    }

    /// Hypothetical answer for `question`, classifying first when no type is given
    pub fn generate_hypothetical_answer(
        &self,
        question: &str,
        prompt_type: Option<PromptType>,
    ) -> Result<String> {
        let prompt_type = match prompt_type {
            Some(ty) => ty,
            None => self.auto_detect_prompt_type(question)?,
        };
        self.hypothesize(question, prompt_type)
    }

    pub async fn generate_hypothetical_answer_async(
        &self,
        question: &str,
        prompt_type: Option<PromptType>,
    ) -> Result<String> {
        let prompt_type = match prompt_type {
            Some(ty) => ty,
            None => self.auto_detect_prompt_type_async(question).await?,
        };
        self.hypothesize_async(question, prompt_type).await
    }

    /// Answer `question` through a hypothesis-driven retrieval
    ///
    /// `top_k` falls back to the configured value.
    pub fn run(
        &self,
        question: &str,
        retriever: &dyn BlockingRetriever,
        prompt_type: Option<PromptType>,
        top_k: Option<usize>,
    ) -> Result<String> {
        Ok(self
            .run_detailed(question, retriever, prompt_type, top_k)?
            .final_answer)
    }

    pub fn run_detailed(
        &self,
        question: &str,
        retriever: &dyn BlockingRetriever,
        prompt_type: Option<PromptType>,
        top_k: Option<usize>,
    ) -> Result<HydeResult> {
        let prompt_type = match prompt_type {
            Some(ty) => ty,
            None => self.auto_detect_prompt_type(question)?,
        };
        info!("Hyde: question type {}", prompt_type);

        let hypothesis = self.hypothesize(question, prompt_type)?;

        let top_k = top_k.unwrap_or(self.config.top_k);
        let documents = retriever.retrieve(&hypothesis, top_k)?;
        info!("Hyde: retrieved {} documents", documents.len());

        let prompt = self.final_answer_prompt(question, prompt_type, &documents);
        let final_answer = self.gateway.ask(&prompt)?;

        Ok(HydeResult {
            question: question.to_string(),
            prompt_type,
            hypothetical_answer: hypothesis,
            retrieved_documents: documents,
            final_answer,
        })
    }

    pub async fn run_async(
        &self,
        question: &str,
        retriever: &dyn Retriever,
        prompt_type: Option<PromptType>,
        top_k: Option<usize>,
    ) -> Result<String> {
        Ok(self
            .run_detailed_async(question, retriever, prompt_type, top_k)
            .await?
            .final_answer)
    }

    pub async fn run_detailed_async(
        &self,
        question: &str,
        retriever: &dyn Retriever,
        prompt_type: Option<PromptType>,
        top_k: Option<usize>,
    ) -> Result<HydeResult> {
        let prompt_type = match prompt_type {
            Some(ty) => ty,
            None => self.auto_detect_prompt_type_async(question).await?,
        };
        info!("Hyde: question type {}", prompt_type);

        let hypothesis = self.hypothesize_async(question, prompt_type).await?;

        let top_k = top_k.unwrap_or(self.config.top_k);
        let documents = retriever.retrieve(&hypothesis, top_k).await?;
        info!("Hyde: retrieved {} documents", documents.len());

        let prompt = self.final_answer_prompt(question, prompt_type, &documents);
        let final_answer = self.gateway.ask_async(&prompt).await?;

        Ok(HydeResult {
            question: question.to_string(),
            prompt_type,
            hypothetical_answer: hypothesis,
            retrieved_documents: documents,
            final_answer,
        })
    }

    /// Answer once from documents retrieved with the raw question, once via Hyde
    pub fn compare_with_baseline(
        &self,
        question: &str,
        retriever: &dyn BlockingRetriever,
        prompt_type: Option<PromptType>,
    ) -> Result<BaselineComparison> {
        let top_k = self.config.top_k;

        let baseline_documents = retriever.retrieve(question, top_k)?;
        let baseline_prompt =
            self.final_answer_prompt(question, PromptType::General, &baseline_documents);
        let baseline_answer = self.gateway.ask(&baseline_prompt)?;
        info!(
            "Hyde baseline: retrieved {} documents with the raw question",
            baseline_documents.len()
        );

        let hyde = self.run_detailed(question, retriever, prompt_type, Some(top_k))?;

        Ok(BaselineComparison {
            question: question.to_string(),
            baseline_documents,
            baseline_answer,
            hyde,
        })
    }

    /// Every prompt type with its description
    pub fn available_prompt_types() -> Vec<(PromptType, &'static str)> {
        PromptType::ALL
            .iter()
            .map(|ty| (*ty, ty.description()))
            .collect()
    }

    pub fn cached_hypotheses(&self) -> HashMap<(String, PromptType), String> {
        self.cache.export()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_len(&self) -> usize {
        self.cache.len()
    }

    fn hypothesize(&self, question: &str, prompt_type: PromptType) -> Result<String> {
        if let Some(cached) = self.cached(question, prompt_type) {
            return Ok(cached);
        }

        let prompt = self.hypothesis_prompt(question, prompt_type);
        let hypothesis = self.gateway.ask(&prompt)?;
        self.remember(question, prompt_type, &hypothesis);
        Ok(hypothesis)
    }

    async fn hypothesize_async(&self, question: &str, prompt_type: PromptType) -> Result<String> {
        if let Some(cached) = self.cached(question, prompt_type) {
            return Ok(cached);
        }

        let prompt = self.hypothesis_prompt(question, prompt_type);
        let hypothesis = self.gateway.ask_async(&prompt).await?;
        self.remember(question, prompt_type, &hypothesis);
        Ok(hypothesis)
    }

    fn cached(&self, question: &str, prompt_type: PromptType) -> Option<String> {
        if !self.config.cache_hypotheses {
            return None;
        }
        let hit = self.cache.get(question, prompt_type);
        if hit.is_some() {
            debug!("Hyde: hypothesis cache hit ({})", prompt_type);
        }
        hit
    }

    fn remember(&self, question: &str, prompt_type: PromptType, hypothesis: &str) {
        debug!("Hyde: hypothesis is {} chars", hypothesis.chars().count());
        if self.config.cache_hypotheses {
            self.cache.insert(question, prompt_type, hypothesis.to_string());
        }
    }

    fn classification_prompt(&self, question: &str) -> String {
        render(
            &self.templates.hyde.classification,
            &[("question", question)],
        )
    }

    fn label_to_type(label: &str) -> PromptType {
        let prompt_type = PromptType::from_label(label);
        debug!("Hyde: classifier said {:?} -> {}", label.trim(), prompt_type);
        prompt_type
    }

    fn hypothesis_prompt(&self, question: &str, prompt_type: PromptType) -> String {
        render(
            self.templates.hyde.hypothesis.get(prompt_type),
            &[("question", question)],
        )
    }

    fn final_answer_prompt(
        &self,
        question: &str,
        prompt_type: PromptType,
        documents: &[String],
    ) -> String {
        let context = format_documents(documents);
        render(
            self.templates.hyde.final_answer.get(prompt_type),
            &[("question", question), ("context", &context)],
        )
    }
}

/// Number documents for the final-answer prompt
fn format_documents(documents: &[String]) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, doc)| format!("文档{}:\n{}", i + 1, doc))
        .collect::<Vec<_>>()
        .join("\n\n")
}

const TECHNICAL_KEYWORDS: &[&str] = &[
    "代码", "编程", "算法", "api", "数据库", "框架", "库", "技术", "实现", "开发", "系统", "架构",
    "性能", "优化", "bug", "debug",
];

const BUSINESS_KEYWORDS: &[&str] = &[
    "商业", "市场", "营销", "销售", "客户", "用户", "产品", "服务", "策略", "管理", "运营", "盈利",
    "成本", "竞争", "品牌",
];

const ACADEMIC_KEYWORDS: &[&str] = &[
    "研究", "理论", "实验", "分析", "论文", "学术", "科学", "方法", "模型", "假设", "数据", "统计",
    "文献", "期刊",
];

/// Keyword-count classifier that makes no LLM call
///
/// Ties prefer technical, then business, then academic; no hits at all
/// yield [`PromptType::Enhanced`].
pub fn heuristic_prompt_type(question: &str) -> PromptType {
    let lowered = question.to_lowercase();
    let score = |keywords: &[&str]| keywords.iter().filter(|k| lowered.contains(*k)).count();

    let technical = score(TECHNICAL_KEYWORDS);
    let business = score(BUSINESS_KEYWORDS);
    let academic = score(ACADEMIC_KEYWORDS);

    if technical > 0 && technical >= business && technical >= academic {
        PromptType::Technical
    } else if business > 0 && business >= academic {
        PromptType::Business
    } else if academic > 0 {
        PromptType::Academic
    } else {
        PromptType::Enhanced
    }
}
