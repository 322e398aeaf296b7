//! Single point of contact with the completion endpoint
//!
//! Every strategy runner holds an `Arc<Gateway>`. The gateway owns the
//! system prompt and default sampling options, builds message lists, and
//! exposes the four call shapes: blocking or async, whole text or stream.

use super::client::{
    BlockingLLMClient, ChatMessage, CompletionOptions, LLMClient, OpenAIClient, TextIter,
    TextStream,
};
use crate::config::LLMServiceConfig;
use crate::error::Result;
use futures::StreamExt;
use std::sync::Arc;

/// Grounded-answer policy applied to every call unless overridden
pub const DEFAULT_SYSTEM_PROMPT: &str = r#"你是一个专业的问答助手，专门根据提供的上下文信息来回答用户的问题。请遵循以下规则：

1. **严格基于上下文**：只使用提供的context上下文信息来回答问题，不要添加任何上下文中没有的信息。

2. **准确性优先**：如果上下文中没有足够的信息来回答问题，请明确说明"根据提供的上下文信息，无法回答这个问题"或"上下文中没有包含相关信息"。

3. **结构化回答**：
   - 直接回答用户的核心问题
   - 提供相关的详细信息和解释
   - 如果有多个相关点，请分点列出

4. **引用意识**：在回答时，可以提及信息来源于上下文，如"根据提供的资料"、"文档中提到"等。

5. **保持客观**：以中性、客观的语调回答，避免主观判断和推测。

6. **完整性检查**：确保回答完整地解决了用户的问题，如果问题有多个部分，请逐一回应。

请根据即将提供的上下文信息，准确回答用户的问题。"#;

/// Build a request: system prompt, then history in order, then the user turn
///
/// An empty `system` is skipped.
pub fn build_messages(
    user_content: &str,
    system_content: &str,
    history: Option<&[ChatMessage]>,
) -> Vec<ChatMessage> {
    let history = history.unwrap_or_default();
    let mut messages = Vec::with_capacity(history.len() + 2);

    if !system_content.is_empty() {
        messages.push(ChatMessage::system(system_content));
    }
    messages.extend_from_slice(history);
    messages.push(ChatMessage::user(user_content));
    messages
}

pub struct Gateway {
    client: Arc<dyn LLMClient>,
    blocking_client: Arc<dyn BlockingLLMClient>,
    system_prompt: String,
    options: CompletionOptions,
}

impl Gateway {
    /// Create from a client implementing both call modes
    pub fn new<C>(client: Arc<C>) -> Self
    where
        C: LLMClient + BlockingLLMClient + 'static,
    {
        Self {
            client: client.clone(),
            blocking_client: client,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            options: CompletionOptions::default(),
        }
    }

    /// Create from separate async and blocking transports
    pub fn from_parts(
        client: Arc<dyn LLMClient>,
        blocking_client: Arc<dyn BlockingLLMClient>,
    ) -> Self {
        Self {
            client,
            blocking_client,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            options: CompletionOptions::default(),
        }
    }

    /// Create an OpenAI-compatible gateway from configuration
    pub fn from_config(config: LLMServiceConfig) -> Result<Self> {
        let options = CompletionOptions::from_config(&config);
        let system_prompt = config.system_prompt.clone();
        let client = Arc::new(OpenAIClient::new(config)?);

        let gateway = Self::new(client).with_options(options);
        Ok(match system_prompt {
            Some(prompt) => gateway.with_system_prompt(prompt),
            None => gateway,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(LLMServiceConfig::from_env()?)
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn with_options(mut self, options: CompletionOptions) -> Self {
        self.options = options;
        self
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    /// Messages for `user_content` under this gateway's system prompt
    pub fn build_messages(
        &self,
        user_content: &str,
        history: Option<&[ChatMessage]>,
    ) -> Vec<ChatMessage> {
        build_messages(user_content, &self.system_prompt, history)
    }

    /// Blocking call returning the full response text
    pub fn complete(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.complete_with_options(messages, &self.options)
    }

    pub fn complete_with_options(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String> {
        self.blocking_client.chat_completion_blocking(messages, options)
    }

    /// Blocking call returning fragments as they arrive
    pub fn complete_streaming(&self, messages: Vec<ChatMessage>) -> Result<TextIter> {
        self.blocking_client
            .chat_completion_stream_blocking(messages, &self.options)
    }

    pub async fn complete_async(&self, messages: Vec<ChatMessage>) -> Result<String> {
        self.complete_async_with_options(messages, &self.options).await
    }

    pub async fn complete_async_with_options(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String> {
        self.client.chat_completion(messages, options).await
    }

    pub async fn complete_stream_async(&self, messages: Vec<ChatMessage>) -> Result<TextStream> {
        self.client.chat_completion_stream(messages, &self.options).await
    }

    /// Shorthand: build messages around `prompt` and complete, blocking
    pub fn ask(&self, prompt: &str) -> Result<String> {
        self.complete(self.build_messages(prompt, None))
    }

    pub async fn ask_async(&self, prompt: &str) -> Result<String> {
        self.complete_async(self.build_messages(prompt, None)).await
    }

    /// Stream the answer to `prompt` and drain it into one string
    pub async fn ask_streamed_async(&self, prompt: &str) -> Result<String> {
        let stream = self
            .complete_stream_async(self.build_messages(prompt, None))
            .await?;
        collect_stream(stream).await
    }
}

/// Concatenate every fragment of a stream, failing on the first error
pub async fn collect_stream(mut stream: TextStream) -> Result<String> {
    let mut text = String::new();
    while let Some(fragment) = stream.next().await {
        let fragment = fragment?;
        tracing::trace!("fragment: {}", fragment);
        text.push_str(&fragment);
    }
    Ok(text)
}

/// Blocking counterpart of [`collect_stream`]
pub fn collect_iter(fragments: TextIter) -> Result<String> {
    fragments.collect()
}
