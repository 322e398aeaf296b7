//! RagStrat Core Library
//!
//! Retrieval-augmented generation strategies over an OpenAI-compatible
//! chat completion endpoint.
//!
//! # Features
//! - Hyde: retrieve with a hypothetical answer instead of the raw question
//! - Refine: rewrite an answer chunk by chunk
//! - Map-Reduce: answer chunks concurrently and merge the partial answers
//! - Query decomposition: answer sub-questions and summarize
//! - Blocking and async calls, with streamed final answers

pub mod config;
pub mod error;
pub mod llm;
pub mod retrieval;
pub mod strategies;
pub mod templates;

pub use config::{
    Config, DecompositionConfig, HydeConfig, LLMServiceConfig, MapReduceConfig, RefineConfig,
};
pub use error::{Error, RagStratError, Result};
pub use llm::{
    build_messages, collect_iter, collect_stream, BlockingLLMClient, ChatMessage,
    CompletionOptions, Gateway, LLMClient, OpenAIClient, Role, TextIter, TextStream,
    DEFAULT_SYSTEM_PROMPT,
};
pub use retrieval::{BlockingRetriever, KeywordRetriever, Retriever};
pub use strategies::{
    heuristic_prompt_type, parse_decomposition, split_context, split_into_chunks,
    BaselineComparison, DecompositionResult, HydeResult, HydeRunner, HypothesisCache,
    MapReduceResult, MapReduceRunner, QueryDecompositionRunner, RefineResult, RefineRunner,
    SplitStats, SubAnswer, SubQuery, SUB_QUERY_ERROR_PREFIX,
};
pub use templates::{render, PromptTemplates, PromptType};

/// Default config directory name
pub const CONFIG_DIR_NAME: &str = "ragstrat";
