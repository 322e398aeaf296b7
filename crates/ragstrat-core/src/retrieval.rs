//! Retrieval seam
//!
//! The vector store lives outside this crate. Runners only see
//! `(query, top_k) -> documents`, either async ([`Retriever`]) or blocking
//! ([`BlockingRetriever`], implemented by plain closures).

use crate::error::Result;
use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashSet;
use std::path::Path;

/// Async document retrieval
#[async_trait]
pub trait Retriever: Send + Sync {
    /// Return up to `top_k` documents ranked by relevance to `query`
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>>;
}

/// Blocking document retrieval
pub trait BlockingRetriever {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>>;
}

impl<F> BlockingRetriever for F
where
    F: Fn(&str, usize) -> Vec<String>,
{
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self(query, top_k))
    }
}

lazy_static! {
    static ref TOKEN_RE: Regex =
        Regex::new(r"(\p{Han}+)|([[\p{L}\p{N}_]--\p{Han}]+)").expect("valid token regex");
}

/// Keyword-overlap retriever over an in-memory knowledge list
///
/// Scores each document by the number of shared terms with the query.
/// Latin words are lowercased; runs of Han characters are split into
/// bigrams since they carry no whitespace.
#[derive(Debug, Clone, Default)]
pub struct KeywordRetriever {
    documents: Vec<String>,
    terms: Vec<HashSet<String>>,
}

impl KeywordRetriever {
    pub fn new(documents: Vec<String>) -> Self {
        let terms = documents.iter().map(|d| tokenize(d)).collect();
        Self { documents, terms }
    }

    /// Load a JSON array of strings
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    pub fn from_json_str(content: &str) -> Result<Self> {
        let documents: Vec<String> = serde_json::from_str(content)?;
        Ok(Self::new(documents))
    }

    pub fn documents(&self) -> &[String] {
        &self.documents
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// Top `top_k` documents with at least one shared term, best first
    pub fn search(&self, query: &str, top_k: usize) -> Vec<String> {
        let query_terms = tokenize(query);

        let mut scored: Vec<(usize, usize)> = self
            .terms
            .iter()
            .enumerate()
            .map(|(idx, doc_terms)| (doc_terms.intersection(&query_terms).count(), idx))
            .filter(|(score, _)| *score > 0)
            .collect();

        // Stable sort keeps knowledge order among equal scores
        scored.sort_by(|a, b| b.0.cmp(&a.0));

        tracing::debug!(
            "Keyword retrieval: {} of {} documents matched",
            scored.len(),
            self.documents.len()
        );

        scored
            .into_iter()
            .take(top_k)
            .map(|(_, idx)| self.documents[idx].clone())
            .collect()
    }
}

#[async_trait]
impl Retriever for KeywordRetriever {
    async fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self.search(query, top_k))
    }
}

impl BlockingRetriever for KeywordRetriever {
    fn retrieve(&self, query: &str, top_k: usize) -> Result<Vec<String>> {
        Ok(self.search(query, top_k))
    }
}

fn tokenize(text: &str) -> HashSet<String> {
    let mut terms = HashSet::new();
    for caps in TOKEN_RE.captures_iter(text) {
        if let Some(han) = caps.get(1) {
            let chars: Vec<char> = han.as_str().chars().collect();
            if chars.len() == 1 {
                terms.insert(han.as_str().to_string());
            } else {
                for pair in chars.windows(2) {
                    terms.insert(pair.iter().collect());
                }
            }
        } else if let Some(word) = caps.get(2) {
            terms.insert(word.as_str().to_lowercase());
        }
    }
    terms
}

#[cfg(test)]
mod tests {
    use super::*;

    fn knowledge() -> KeywordRetriever {
        KeywordRetriever::new(vec![
            "智能体是能够感知环境并自主行动的系统".to_string(),
            "Rust uses ownership for memory safety".to_string(),
            "多智能体系统由多个智能体协作完成任务".to_string(),
            "Tokio is an async runtime for Rust".to_string(),
        ])
    }

    #[test]
    fn test_search_ranks_by_overlap() {
        let retriever = knowledge();
        let results = retriever.search("多智能体如何协作", 5);
        assert_eq!(results[0], "多智能体系统由多个智能体协作完成任务");
        assert_eq!(results.len(), 2);
    }

    #[test]
    fn test_search_latin_case_insensitive_and_top_k() {
        let retriever = knowledge();
        let results = retriever.search("RUST", 1);
        assert_eq!(results, vec!["Rust uses ownership for memory safety".to_string()]);
    }

    #[test]
    fn test_search_no_match() {
        assert!(knowledge().search("quantum", 5).is_empty());
    }

    #[test]
    fn test_from_json_str() {
        let retriever = KeywordRetriever::from_json_str(r#"["a doc", "b doc"]"#).unwrap();
        assert_eq!(retriever.len(), 2);
        assert!(KeywordRetriever::from_json_str("{}").is_err());
    }

    #[test]
    fn test_closure_is_blocking_retriever() {
        let fixed = |_q: &str, k: usize| vec!["doc".to_string(); k];
        let retriever: &dyn BlockingRetriever = &fixed;
        assert_eq!(retriever.retrieve("anything", 2).unwrap().len(), 2);
    }

    #[test]
    fn test_tokenize_han_bigrams() {
        let terms = tokenize("智能体 Agent");
        assert!(terms.contains("智能"));
        assert!(terms.contains("能体"));
        assert!(terms.contains("agent"));
    }
}
