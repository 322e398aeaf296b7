//! Configuration management

use crate::error::{RagStratError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// LLM service configuration
    #[serde(default)]
    pub llm_service: LLMServiceConfig,

    #[serde(default)]
    pub hyde: HydeConfig,

    #[serde(default)]
    pub refine: RefineConfig,

    #[serde(default)]
    pub map_reduce: MapReduceConfig,

    #[serde(default)]
    pub decomposition: DecompositionConfig,
}

/// OpenAI-compatible chat completion service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMServiceConfig {
    /// API key sent as a bearer token
    #[serde(default)]
    pub api_key: String,

    /// Base URL, `/chat/completions` is appended
    #[serde(default)]
    pub base_url: String,

    /// Model name for chat completions
    #[serde(default = "default_chat_model")]
    pub model: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    #[serde(default)]
    pub temperature: Option<f32>,

    #[serde(default)]
    pub max_tokens: Option<u32>,

    /// Overrides the default grounded-answer system prompt
    #[serde(default)]
    pub system_prompt: Option<String>,
}

impl LLMServiceConfig {
    /// Create a config from the two required values, everything else defaulted
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            model: default_chat_model(),
            timeout_secs: default_timeout(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Read `LLM_API_KEY`, `LLM_API_URL` and optionally `LLM_MODEL`
    pub fn from_env() -> Result<Self> {
        let config = Self::default();
        config.validate()?;
        Ok(config)
    }

    /// Both the key and the base URL are required
    pub fn validate(&self) -> Result<()> {
        if self.api_key.trim().is_empty() {
            return Err(RagStratError::Config("LLM api_key is not set".to_string()));
        }
        if self.base_url.trim().is_empty() {
            return Err(RagStratError::Config("LLM base_url is not set".to_string()));
        }
        Ok(())
    }

    /// Full chat completions endpoint
    pub fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

impl Default for LLMServiceConfig {
    fn default() -> Self {
        Self {
            api_key: std::env::var("LLM_API_KEY").unwrap_or_default(),
            base_url: std::env::var("LLM_API_URL").unwrap_or_default(),
            model: default_chat_model(),
            timeout_secs: default_timeout(),
            temperature: None,
            max_tokens: None,
            system_prompt: None,
        }
    }
}

fn default_chat_model() -> String {
    std::env::var("LLM_MODEL").unwrap_or_else(|_| "deepseek-chat".to_string())
}

fn default_timeout() -> u64 {
    60
}

/// Hyde runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HydeConfig {
    /// Documents requested from the retriever
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Reuse hypothetical answers for repeated (question, prompt type) pairs
    #[serde(default = "default_true")]
    pub cache_hypotheses: bool,
}

impl Default for HydeConfig {
    fn default() -> Self {
        Self {
            top_k: default_top_k(),
            cache_hypotheses: true,
        }
    }
}

/// Refine runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefineConfig {
    #[serde(default = "default_iteration_count")]
    pub iteration_count: usize,
}

impl Default for RefineConfig {
    fn default() -> Self {
        Self {
            iteration_count: default_iteration_count(),
        }
    }
}

/// Map-Reduce runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MapReduceConfig {
    #[serde(default = "default_chunk_count")]
    pub chunk_count: usize,

    /// Ceiling on in-flight map calls in async mode
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent_requests: usize,
}

impl Default for MapReduceConfig {
    fn default() -> Self {
        Self {
            chunk_count: default_chunk_count(),
            max_concurrent_requests: default_max_concurrent(),
        }
    }
}

/// Query decomposition runner settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecompositionConfig {
    /// Documents requested per sub-query when a retriever is supplied
    #[serde(default = "default_top_k")]
    pub retrieval_top_k: usize,
}

impl Default for DecompositionConfig {
    fn default() -> Self {
        Self {
            retrieval_top_k: default_top_k(),
        }
    }
}

fn default_top_k() -> usize {
    5
}

fn default_true() -> bool {
    true
}

fn default_iteration_count() -> usize {
    3
}

fn default_chunk_count() -> usize {
    3
}

fn default_max_concurrent() -> usize {
    5
}

impl Config {
    /// Load config from default path
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path())
    }

    /// Load config from a YAML file, defaults if the file does not exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            Self::from_yaml_str(&content)
        } else {
            Ok(Config::default())
        }
    }

    pub fn from_yaml_str(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Get default config path
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(crate::CONFIG_DIR_NAME)
            .join("config.yml")
    }
}
