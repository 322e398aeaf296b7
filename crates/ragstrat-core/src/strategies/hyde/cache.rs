//! In-memory store of generated hypothetical answers

use crate::templates::PromptType;
use std::collections::HashMap;
use std::sync::RwLock;

type CacheKey = (String, PromptType);

/// Hypothesis cache keyed by question and prompt type
///
/// Additive only: entries never expire and are dropped only by `clear`.
#[derive(Default)]
pub struct HypothesisCache {
    entries: RwLock<HashMap<CacheKey, String>>,
}

impl HypothesisCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, question: &str, prompt_type: PromptType) -> Option<String> {
        let entries = self.entries.read().ok()?;
        entries.get(&(question.to_string(), prompt_type)).cloned()
    }

    pub fn insert(&self, question: &str, prompt_type: PromptType, hypothesis: String) {
        if let Ok(mut entries) = self.entries.write() {
            entries.insert((question.to_string(), prompt_type), hypothesis);
        }
    }

    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.write() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.read().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every cached entry
    pub fn export(&self) -> HashMap<CacheKey, String> {
        self.entries
            .read()
            .map(|e| e.clone())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_basic() {
        let cache = HypothesisCache::new();
        cache.insert("q", PromptType::Technical, "h".to_string());

        assert_eq!(cache.get("q", PromptType::Technical), Some("h".to_string()));
        assert_eq!(cache.get("q", PromptType::Business), None);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_cache_clear_and_export() {
        let cache = HypothesisCache::new();
        cache.insert("q1", PromptType::General, "a".to_string());
        cache.insert("q2", PromptType::General, "b".to_string());

        let exported = cache.export();
        assert_eq!(exported.len(), 2);
        assert_eq!(exported[&("q2".to_string(), PromptType::General)], "b");

        cache.clear();
        assert!(cache.is_empty());
    }
}
