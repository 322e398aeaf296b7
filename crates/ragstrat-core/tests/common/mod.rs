//! Scripted completion client shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use ragstrat_core::{
    BlockingLLMClient, ChatMessage, CompletionOptions, Gateway, LLMClient, PromptTemplates,
    RagStratError, Result, TextIter, TextStream,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

type Responder = Box<dyn Fn(&str) -> Result<String> + Send + Sync>;
type Delay = Box<dyn Fn(&str) -> Option<Duration> + Send + Sync>;

/// Answers each request from a script and records what it was sent
pub struct ScriptedClient {
    responder: Responder,
    delay: Option<Delay>,
    requests: Mutex<Vec<Vec<ChatMessage>>>,
    options: Mutex<Vec<CompletionOptions>>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedClient {
    /// Reply to each call with the next string, in call order
    pub fn sequence(replies: &[&str]) -> Self {
        let queue: Mutex<VecDeque<String>> =
            Mutex::new(replies.iter().map(|r| r.to_string()).collect());
        Self::with_responder(move |_| {
            queue
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| RagStratError::Provider("script exhausted".to_string()))
        })
    }

    /// Reply by inspecting the user prompt
    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&str) -> Result<String> + Send + Sync + 'static,
    {
        Self {
            responder: Box::new(responder),
            delay: None,
            requests: Mutex::new(Vec::new()),
            options: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        }
    }

    /// Sleep before answering async calls
    pub fn delayed<F>(mut self, delay: F) -> Self
    where
        F: Fn(&str) -> Option<Duration> + Send + Sync + 'static,
    {
        self.delay = Some(Box::new(delay));
        self
    }

    /// User prompts in the order calls started
    pub fn prompts(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|messages| messages.last().map(|m| m.content.clone()).unwrap_or_default())
            .collect()
    }

    pub fn requests(&self) -> Vec<Vec<ChatMessage>> {
        self.requests.lock().unwrap().clone()
    }

    pub fn options(&self) -> Vec<CompletionOptions> {
        self.options.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Highest number of async calls observed at once
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn record(&self, messages: &[ChatMessage], options: &CompletionOptions) -> String {
        let prompt = messages.last().map(|m| m.content.clone()).unwrap_or_default();
        self.requests.lock().unwrap().push(messages.to_vec());
        self.options.lock().unwrap().push(options.clone());
        prompt
    }

    async fn answer_async(&self, prompt: &str) -> Result<String> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);

        if let Some(delay) = self.delay.as_ref().and_then(|d| d(prompt)) {
            tokio::time::sleep(delay).await;
        }
        let reply = (self.responder)(prompt);

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        reply
    }
}

/// Split a reply into two fragments so streams carry more than one item
fn fragments(reply: String) -> Vec<Result<String>> {
    let mid = reply
        .char_indices()
        .nth(reply.chars().count() / 2)
        .map(|(i, _)| i)
        .unwrap_or(reply.len());
    let (head, tail) = reply.split_at(mid);
    vec![Ok(head.to_string()), Ok(tail.to_string())]
}

#[async_trait]
impl LLMClient for ScriptedClient {
    async fn chat_completion(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String> {
        let prompt = self.record(&messages, options);
        self.answer_async(&prompt).await
    }

    async fn chat_completion_stream(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<TextStream> {
        let prompt = self.record(&messages, options);
        let reply = self.answer_async(&prompt).await?;
        Ok(stream::iter(fragments(reply)).boxed())
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

impl BlockingLLMClient for ScriptedClient {
    fn chat_completion_blocking(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<String> {
        let prompt = self.record(&messages, options);
        (self.responder)(&prompt)
    }

    fn chat_completion_stream_blocking(
        &self,
        messages: Vec<ChatMessage>,
        options: &CompletionOptions,
    ) -> Result<TextIter> {
        let prompt = self.record(&messages, options);
        let reply = (self.responder)(&prompt)?;
        Ok(Box::new(fragments(reply).into_iter()))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

/// Gateway and default templates over a scripted client
pub fn setup(client: ScriptedClient) -> (Arc<ScriptedClient>, Arc<Gateway>, Arc<PromptTemplates>) {
    let client = Arc::new(client);
    let gateway = Arc::new(Gateway::new(client.clone()));
    (client, gateway, Arc::new(PromptTemplates::default()))
}

/// Numbered context items
pub fn items(n: usize) -> Vec<String> {
    (1..=n).map(|i| format!("第{}条资料", i)).collect()
}
