use crate::config::LlmConfig;
use crate::types::{ChronoError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::debug;

/// Fixed instruction sent with every post.
pub const ANALYSIS_INSTRUCTION: &str = "You rate social media posts. Reply with a single JSON object \
and nothing else, with exactly these fields: \
\"sentiment\": one of \"positive\", \"neutral\", \"negative\"; \
\"credibilityScore\": a number from 0 to 1, how trustworthy the content is; \
\"botProbability\": a number from 0 to 1, how likely the post comes from an automated or inauthentic account.";

/// A language model that can answer one instruction about one piece of text.
#[async_trait]
pub trait LlmAdapter: Send + Sync {
    fn adapter_name(&self) -> String;

    /// Returns the raw reply text.
    async fn complete(&self, instruction: &str, content: &str) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReplyMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct ApiErrorResponse {
    error: ApiError,
}

/// Adapter for any OpenAI-compatible chat completions endpoint.
pub struct OpenAiCompatibleAdapter {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleAdapter {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }
}

#[async_trait]
impl LlmAdapter for OpenAiCompatibleAdapter {
    fn adapter_name(&self) -> String {
        format!("openai-compatible ({})", self.model)
    }

    async fn complete(&self, instruction: &str, content: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: instruction,
                },
                ChatMessage {
                    role: "user",
                    content,
                },
            ],
            temperature: 0.0,
            response_format: ResponseFormat {
                format_type: "json_object",
            },
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(api_key) = &self.api_key {
            builder = builder.bearer_auth(api_key);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            if let Ok(error_response) = serde_json::from_str::<ApiErrorResponse>(&body) {
                return Err(ChronoError::RemoteAnalysis(format!(
                    "{}: {}",
                    status, error_response.error.message
                )));
            }
            return Err(ChronoError::RemoteAnalysis(format!("{}: {}", status, body)));
        }

        let parsed: ChatResponse = serde_json::from_str(&body)?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ChronoError::RemoteAnalysis("reply has no message content".to_string()))?;

        debug!("Received {} bytes from {}", text.len(), self.endpoint);
        Ok(text)
    }
}

#[derive(Debug, Clone)]
enum MockReply {
    Text(String),
    Failure(String),
}

/// Canned adapter for development and tests.
pub struct MockLlmAdapter {
    name: String,
    reply: MockReply,
    response_delay_ms: u64,
    calls: AtomicUsize,
}

impl MockLlmAdapter {
    pub fn replying(name: impl Into<String>, reply: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: MockReply::Text(reply.into()),
            response_delay_ms: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reply: MockReply::Failure(message.into()),
            response_delay_ms: 0,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn with_delay(mut self, delay_ms: u64) -> Self {
        self.response_delay_ms = delay_ms;
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LlmAdapter for MockLlmAdapter {
    fn adapter_name(&self) -> String {
        format!("Mock LLM Adapter ({})", self.name)
    }

    async fn complete(&self, _instruction: &str, _content: &str) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.response_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.response_delay_ms)).await;
        }
        match &self.reply {
            MockReply::Text(text) => Ok(text.clone()),
            MockReply::Failure(message) => Err(ChronoError::RemoteAnalysis(message.clone())),
        }
    }
}
