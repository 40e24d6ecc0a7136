//! Remote text-generation client.
//!
//! `ChatModel` is the seam the chat service talks to; `GeminiClient` is the
//! production implementation that streams replies over server-sent events.

use std::pin::Pin;
use std::time::Duration;
use async_stream::stream;
use async_trait::async_trait;
use futures::{Stream, StreamExt};
use log::{debug, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use crate::errors::AppError;
use crate::models::message::{Message, Role};

const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Incremental reply text, in arrival order.
pub type TokenStream = Pin<Box<dyn Stream<Item = Result<String, AppError>> + Send>>;

#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Sends the ordered history and returns the reply as a token stream.
    async fn stream_chat(&self, system_prompt: &str, history: &[Message]) -> Result<TokenStream, AppError>;

    /// Single completion, collected from the stream.
    async fn complete(&self, system_prompt: &str, history: &[Message]) -> Result<String, AppError> {
        let mut tokens = self.stream_chat(system_prompt, history).await?;
        let mut reply = String::new();
        while let Some(token) = tokens.next().await {
            reply.push_str(&token?);
        }
        Ok(reply)
    }
}

pub struct GeminiClient {
    api_key: String,
    model: String,
    base_url: String,
    client: Client,
}

impl GeminiClient {
    pub fn new(api_key: String, model: String) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AppError::Config(format!("Failed to create HTTP client: {}", e)))?;

        Ok(GeminiClient {
            api_key,
            model,
            base_url: GEMINI_API_BASE.to_string(),
            client,
        })
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn stream_url(&self) -> String {
        format!(
            "{}/models/{}:streamGenerateContent?alt=sse",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }
}

#[async_trait]
impl ChatModel for GeminiClient {
    async fn stream_chat(&self, system_prompt: &str, history: &[Message]) -> Result<TokenStream, AppError> {
        let request = build_request(system_prompt, history);

        debug!(
            "Sending {} messages to model {} (system prompt {} chars)",
            history.len(),
            self.model,
            system_prompt.len()
        );

        let response = self
            .client
            .post(self.stream_url())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Api(format!("{}: {}", status, body)));
        }

        let mut bytes = Box::pin(response.bytes_stream());
        let tokens = stream! {
            let mut events = SseBuffer::default();
            let mut failed = false;
            while let Some(chunk) = bytes.next().await {
                match chunk {
                    Ok(chunk) => {
                        for data in events.push(&chunk) {
                            if let Some(text) = decode_event(&data) {
                                yield Ok(text);
                            }
                        }
                    }
                    Err(e) => {
                        yield Err(AppError::from(e));
                        failed = true;
                        break;
                    }
                }
            }
            if !failed {
                if let Some(data) = events.finish() {
                    if let Some(text) = decode_event(&data) {
                        yield Ok(text);
                    }
                }
            }
        };

        Ok(Box::pin(tokens))
    }
}

fn build_request(system_prompt: &str, history: &[Message]) -> GenerateContentRequest {
    let contents = history
        .iter()
        .map(|message| Content {
            role: Some(
                match message.role {
                    Role::User => "user",
                    Role::Assistant => "model",
                }
                .to_string(),
            ),
            parts: vec![Part { text: message.content.clone() }],
        })
        .collect();

    GenerateContentRequest {
        system_instruction: Some(Content {
            role: None,
            parts: vec![Part { text: system_prompt.to_string() }],
        }),
        contents,
    }
}

/// Accumulates raw SSE bytes and hands back the `data` payload of each complete event.
#[derive(Debug, Default)]
pub struct SseBuffer {
    buffer: Vec<u8>,
}

impl SseBuffer {
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut events = Vec::new();
        while let Some(end) = self.buffer.windows(2).position(|w| w == b"\n\n") {
            let raw: Vec<u8> = self.buffer.drain(..end + 2).collect();
            if let Some(data) = event_data(&raw[..end]) {
                events.push(data);
            }
        }
        events
    }

    /// Flushes a trailing event that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<String> {
        let raw = std::mem::take(&mut self.buffer);
        event_data(&raw)
    }
}

fn event_data(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let lines: Vec<&str> = text
        .lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(|data| data.strip_prefix(' ').unwrap_or(data))
        .collect();

    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Extracts the reply text from one streamed response event.
fn decode_event(data: &str) -> Option<String> {
    let response: GenerateContentResponse = match serde_json::from_str(data) {
        Ok(response) => response,
        Err(e) => {
            warn!("Skipping unparsable stream event: {}", e);
            return None;
        }
    };

    let text: String = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| content.parts.iter().map(|p| p.text.as_str()).collect())
        .unwrap_or_default();

    if text.is_empty() {
        None
    } else {
        Some(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}
