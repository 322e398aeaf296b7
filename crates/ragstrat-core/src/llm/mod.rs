//! LLM integration
//!
//! Provides:
//! - `LLMClient` / `BlockingLLMClient` transport traits
//! - An OpenAI-compatible HTTP client implementing both
//! - The `Gateway` every strategy runner calls through

mod client;
mod gateway;

pub use client::{
    BlockingLLMClient, ChatMessage, CompletionOptions, LLMClient, OpenAIClient, Role, TextIter,
    TextStream,
};
pub use gateway::{build_messages, collect_iter, collect_stream, Gateway, DEFAULT_SYSTEM_PROMPT};
