//! HTTP client for OpenAI-compatible chat completion services

use crate::config::LLMServiceConfig;
use crate::error::{RagStratError, Result};
use async_trait::async_trait;
use futures::stream::{self, BoxStream, StreamExt};
use serde::{Deserialize, Serialize};
use std::io::{BufRead, BufReader};
use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Lazily produced text fragments of a streamed completion
pub type TextStream = BoxStream<'static, Result<String>>;

/// Blocking counterpart of [`TextStream`]
pub type TextIter = Box<dyn Iterator<Item = Result<String>> + Send>;

/// Trait for async LLM service clients
#[async_trait]
pub trait LLMClient: Send + Sync {
    /// Generate chat completion
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String>;

    /// Generate chat completion as a stream of deltas
    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<TextStream>;

    /// Get model name
    fn model_name(&self) -> &str;
}

/// Trait for clients that block the calling thread per request
pub trait BlockingLLMClient: Send + Sync {
    fn chat_completion_blocking(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String>;

    fn chat_completion_stream_blocking(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<TextIter>;

    fn model_name(&self) -> &str;
}

/// Message author
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// Chat message for completion requests
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Per-call sampling options, unset fields are left to the provider
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CompletionOptions {
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
}

impl CompletionOptions {
    pub fn from_config(config: &LLMServiceConfig) -> Self {
        Self {
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<StreamChoice>,
}

#[derive(Deserialize)]
struct StreamChoice {
    #[serde(default)]
    delta: StreamDelta,
}

#[derive(Deserialize, Default)]
struct StreamDelta {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible client (DeepSeek, vLLM, OpenAI, ...)
///
/// Implements both [`LLMClient`] and [`BlockingLLMClient`]. The blocking
/// HTTP client is built on first blocking use; that first use must not
/// happen on an async runtime thread.
pub struct OpenAIClient {
    http_client: reqwest::Client,
    blocking_client: OnceLock<reqwest::blocking::Client>,
    config: LLMServiceConfig,
}

impl OpenAIClient {
    /// Create new client from configuration
    pub fn new(config: LLMServiceConfig) -> Result<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            http_client,
            blocking_client: OnceLock::new(),
            config,
        })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::new(LLMServiceConfig::from_env()?)
    }

    pub fn config(&self) -> &LLMServiceConfig {
        &self.config
    }

    fn blocking(&self) -> Result<&reqwest::blocking::Client> {
        if let Some(client) = self.blocking_client.get() {
            return Ok(client);
        }
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_secs))
            .build()?;
        Ok(self.blocking_client.get_or_init(|| client))
    }

    fn request<'a>(
        &'a self,
        messages: &'a [ChatMessage],
        options: &CompletionOptions,
        stream: bool,
    ) -> ChatRequest<'a> {
        tracing::debug!(
            "Chat request: model={}, messages={}, stream={}",
            self.config.model,
            messages.len(),
            stream
        );
        ChatRequest {
            model: &self.config.model,
            messages,
            stream,
            temperature: options.temperature,
            max_tokens: options.max_tokens,
        }
    }
}

#[async_trait]
impl LLMClient for OpenAIClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String> {
        let start = Instant::now();
        let request = self.request(&messages, options, false);

        let response = self
            .http_client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagStratError::Provider(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        let body = response.text().await?;
        let content = parse_chat_response(&body)?;

        tracing::debug!(
            "Chat completion: {} chars in {} ms",
            content.len(),
            start.elapsed().as_millis()
        );
        Ok(content)
    }

    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<TextStream> {
        let request = self.request(&messages, options, true);

        let response = self
            .http_client
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(RagStratError::Provider(format!(
                "LLM streaming error (HTTP {}): {}",
                status, body
            )));
        }

        let (tx, rx) = tokio::sync::mpsc::channel::<Result<String>>(256);
        let mut byte_stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut decoder = SseDecoder::default();

            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        let _ = tx.send(Err(RagStratError::Http(e))).await;
                        return;
                    }
                };

                for event in decoder.push(&chunk) {
                    let item = match event {
                        Ok(SseEvent::Fragment(text)) => Ok(text),
                        Ok(SseEvent::Done) => return,
                        Err(e) => Err(e),
                    };
                    if tx.send(item).await.is_err() {
                        return;
                    }
                }
            }

            // Final line without a trailing newline
            match decoder.finish() {
                Some(Ok(SseEvent::Fragment(text))) => {
                    let _ = tx.send(Ok(text)).await;
                }
                Some(Err(e)) => {
                    let _ = tx.send(Err(e)).await;
                }
                Some(Ok(SseEvent::Done)) | None => {}
            }
        });

        let fragments = stream::unfold(rx, |mut rx| async move {
            rx.recv().await.map(|item| (item, rx))
        });
        Ok(fragments.boxed())
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

impl BlockingLLMClient for OpenAIClient {
    fn chat_completion_blocking(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String> {
        let request = self.request(&messages, options, false);

        let response = self
            .blocking()?
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(RagStratError::Provider(format!(
                "LLM service error (HTTP {}): {}",
                status, body
            )));
        }

        parse_chat_response(&response.text()?)
    }

    fn chat_completion_stream_blocking(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<TextIter> {
        let request = self.request(&messages, options, true);

        let response = self
            .blocking()?
            .post(self.config.chat_completions_url())
            .bearer_auth(&self.config.api_key)
            .json(&request)
            .send()?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().unwrap_or_default();
            return Err(RagStratError::Provider(format!(
                "LLM streaming error (HTTP {}): {}",
                status, body
            )));
        }

        Ok(Box::new(SseLines::new(BufReader::new(response))))
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

fn parse_chat_response(body: &str) -> Result<String> {
    let chat_response: ChatResponse = serde_json::from_str(body).map_err(|e| {
        tracing::debug!("Malformed LLM response body: {}", body);
        RagStratError::Provider(format!("Malformed LLM response: {}", e))
    })?;

    chat_response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| RagStratError::Llm("No response from LLM".to_string()))
}

/// One decoded server-sent event
#[derive(Debug, PartialEq, Eq)]
enum SseEvent {
    Fragment(String),
    Done,
}

/// Decode a single SSE line; `None` for lines that carry no text
fn parse_sse_line(line: &str) -> Option<Result<SseEvent>> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data == "[DONE]" {
        return Some(Ok(SseEvent::Done));
    }
    if data.is_empty() {
        return None;
    }

    match serde_json::from_str::<StreamChunk>(data) {
        Ok(chunk) => chunk
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.delta.content)
            .filter(|s| !s.is_empty())
            .map(|s| Ok(SseEvent::Fragment(s))),
        Err(e) => Some(Err(RagStratError::Provider(format!(
            "Malformed stream chunk: {}",
            e
        )))),
    }
}

/// Incremental SSE decoder for byte chunks that may split lines or UTF-8 sequences
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<Result<SseEvent>> {
        self.buffer.extend_from_slice(bytes);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&line);
            if let Some(event) = parse_sse_line(&line) {
                events.push(event);
            }
        }
        events
    }

    /// Parse whatever is left once the byte stream has ended
    fn finish(&mut self) -> Option<Result<SseEvent>> {
        if self.buffer.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.buffer);
        parse_sse_line(&String::from_utf8_lossy(&rest))
    }
}

/// Blocking SSE reader yielding text fragments until `[DONE]` or EOF
struct SseLines<R> {
    reader: R,
    finished: bool,
}

impl<R: BufRead> SseLines<R> {
    fn new(reader: R) -> Self {
        Self {
            reader,
            finished: false,
        }
    }
}

impl<R: BufRead> Iterator for SseLines<R> {
    type Item = Result<String>;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.finished {
            let mut line = String::new();
            match self.reader.read_line(&mut line) {
                Ok(0) => self.finished = true,
                Ok(_) => match parse_sse_line(&line) {
                    Some(Ok(SseEvent::Fragment(text))) => return Some(Ok(text)),
                    Some(Ok(SseEvent::Done)) => self.finished = true,
                    Some(Err(e)) => return Some(Err(e)),
                    None => {}
                },
                Err(e) => {
                    self.finished = true;
                    return Some(Err(RagStratError::Io(e)));
                }
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    const STREAM_BODY: &str = "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"智能\"}}]}\n\n\
: keep-alive\n\
data: {\"choices\":[{\"delta\":{\"content\":\"体\"}}]}\n\n\
data: [DONE]\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n";

    #[test]
    fn test_parse_chat_response() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hello"}}]}"#;
        assert_eq!(parse_chat_response(body).unwrap(), "hello");
    }

    #[test]
    fn test_parse_chat_response_errors() {
        assert!(matches!(
            parse_chat_response("<html>bad gateway</html>"),
            Err(RagStratError::Provider(_))
        ));
        assert!(matches!(
            parse_chat_response(r#"{"choices":[]}"#),
            Err(RagStratError::Llm(_))
        ));
    }

    #[test]
    fn test_blocking_sse_lines_stop_at_done() {
        let fragments: Vec<String> = SseLines::new(Cursor::new(STREAM_BODY))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(fragments, vec!["智能".to_string(), "体".to_string()]);
    }

    #[test]
    fn test_decoder_handles_split_utf8_and_lines() {
        let bytes = STREAM_BODY.as_bytes();
        let mut decoder = SseDecoder::default();
        let mut events = Vec::new();
        // Byte-at-a-time feeding splits every multi-byte character
        for b in bytes {
            events.extend(decoder.push(std::slice::from_ref(b)));
        }

        let events: Vec<SseEvent> = events.into_iter().map(|e| e.unwrap()).collect();
        assert_eq!(
            &events[..3],
            &[
                SseEvent::Fragment("智能".to_string()),
                SseEvent::Fragment("体".to_string()),
                SseEvent::Done
            ]
        );
    }

    #[test]
    fn test_decoder_flushes_unterminated_last_line() {
        let body = "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n\n\
data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}";

        let mut decoder = SseDecoder::default();
        let mut events: Vec<SseEvent> = decoder
            .push(body.as_bytes())
            .into_iter()
            .map(|e| e.unwrap())
            .collect();
        events.extend(decoder.finish().map(|e| e.unwrap()));

        assert_eq!(
            events,
            vec![
                SseEvent::Fragment("a".to_string()),
                SseEvent::Fragment("b".to_string())
            ]
        );
        assert!(decoder.finish().is_none());

        let blocking: Vec<String> = SseLines::new(Cursor::new(body))
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(blocking, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_malformed_stream_chunk() {
        let result = parse_sse_line("data: {not json}");
        assert!(matches!(result, Some(Err(RagStratError::Provider(_)))));
        assert!(parse_sse_line("event: ping").is_none());
    }

    #[test]
    fn test_request_serialization_skips_unset_options() {
        let messages = vec![ChatMessage::user("hi")];
        let request = ChatRequest {
            model: "deepseek-chat",
            messages: &messages,
            stream: false,
            temperature: None,
            max_tokens: Some(64),
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");
        assert_eq!(json["max_tokens"], 64);
        assert!(json.get("temperature").is_none());
    }

    #[test]
    fn test_client_requires_credentials() {
        let config = LLMServiceConfig::new("", "");
        assert!(matches!(
            OpenAIClient::new(config),
            Err(RagStratError::Config(_))
        ));
    }
}
