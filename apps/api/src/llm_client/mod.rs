//! LLM Client — the only module that talks to the Anthropic Messages API.
//!
//! Document understanding goes through `extraction::LlmExtractionGateway`,
//! which builds prompts and hands this client at most one attachment per call.
//! Images travel as `image` blocks, PDFs as `document` blocks, both base64.
//!
//! Model: claude-sonnet-4-5 (hardcoded, not configurable).

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::documents::DocumentData;

pub mod prompts;

pub const DEFAULT_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 4096;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Gave up after {attempts} attempts")]
    Exhausted { attempts: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,
}

/// Attempts and backoff for transient failures (transport errors, 429, 5xx).
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    /// Delay before attempt `attempt` (0-based): none, then base, 2×base, 4×base...
    fn delay_before(&self, attempt: u32) -> Option<Duration> {
        (attempt > 0).then(|| self.base_delay * (1u32 << (attempt - 1).min(16)))
    }
}

fn is_retryable(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

// ────────────────────────────────────────────────────────────────────────────
// Wire types
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<UserMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: Vec<ContentPart<'a>>,
}

/// One block of a user message. Attachments go before the instruction text.
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum ContentPart<'a> {
    Text { text: &'a str },
    Image { source: Base64Source<'a> },
    Document { source: Base64Source<'a> },
}

#[derive(Debug, Serialize)]
struct Base64Source<'a> {
    #[serde(rename = "type")]
    source_type: &'static str,
    media_type: &'a str,
    data: &'a str,
}

impl<'a> ContentPart<'a> {
    fn attachment(document: &'a DocumentData) -> Self {
        let source = Base64Source {
            source_type: "base64",
            media_type: document.media_type(),
            data: document.base64(),
        };
        if document.is_pdf() {
            ContentPart::Document { source }
        } else {
            ContentPart::Image { source }
        }
    }
}

fn build_request<'a>(
    prompt: &'a str,
    system: &'a str,
    attachment: Option<&'a DocumentData>,
) -> MessagesRequest<'a> {
    let content = attachment
        .map(ContentPart::attachment)
        .into_iter()
        .chain(std::iter::once(ContentPart::Text { text: prompt }))
        .collect();
    MessagesRequest {
        model: MODEL,
        max_tokens: MAX_TOKENS,
        system,
        messages: vec![UserMessage {
            role: "user",
            content,
        }],
    }
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
    #[serde(default)]
    pub stop_reason: Option<String>,
    pub usage: Usage,
}

#[derive(Debug, Deserialize)]
pub struct ContentBlock {
    #[serde(rename = "type")]
    pub block_type: String,
    pub text: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Usage {
    pub input_tokens: u32,
    pub output_tokens: u32,
}

impl LlmResponse {
    /// All text blocks concatenated, or `None` when there are none.
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter(|b| b.block_type == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        (!parts.is_empty()).then(|| parts.concat())
    }

    pub fn was_truncated(&self) -> bool {
        self.stop_reason.as_deref() == Some("max_tokens")
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    message: String,
}

// ────────────────────────────────────────────────────────────────────────────
// Client
// ────────────────────────────────────────────────────────────────────────────

#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
    api_url: String,
    retry: RetryPolicy,
}

impl LlmClient {
    pub fn new(api_key: String, api_url: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            api_key,
            api_url,
            retry: RetryPolicy::default(),
        })
    }

    /// Sends one user message (optional attachment, then `prompt`) and returns
    /// the raw response. Transient failures are retried per `RetryPolicy`;
    /// other 4xx responses fail immediately.
    pub async fn call(
        &self,
        prompt: &str,
        system: &str,
        attachment: Option<&DocumentData>,
    ) -> Result<LlmResponse, LlmError> {
        let request_body = build_request(prompt, system, attachment);
        let mut last_error: Option<LlmError> = None;

        for attempt in 0..self.retry.max_attempts {
            if let Some(delay) = self.retry.delay_before(attempt) {
                warn!(
                    attempt,
                    delay_ms = delay.as_millis() as u64,
                    "Retrying LLM call: {}",
                    last_error.as_ref().map(|e| e.to_string()).unwrap_or_default()
                );
                tokio::time::sleep(delay).await;
            }

            let response = match self
                .client
                .post(&self.api_url)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request_body)
                .send()
                .await
            {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                let message = serde_json::from_str::<ApiErrorEnvelope>(&body)
                    .map(|e| e.error.message)
                    .unwrap_or(body);
                let error = LlmError::Api {
                    status: status.as_u16(),
                    message,
                };
                if is_retryable(status) {
                    last_error = Some(error);
                    continue;
                }
                return Err(error);
            }

            let llm_response: LlmResponse = response.json().await?;
            debug!(
                input_tokens = llm_response.usage.input_tokens,
                output_tokens = llm_response.usage.output_tokens,
                "LLM call succeeded"
            );
            if llm_response.was_truncated() {
                warn!("LLM response hit max_tokens; JSON may be incomplete");
            }
            return Ok(llm_response);
        }

        Err(last_error.unwrap_or(LlmError::Exhausted {
            attempts: self.retry.max_attempts,
        }))
    }

    /// Calls the LLM and deserializes the reply as JSON. The prompt must ask
    /// for JSON; fences and surrounding prose are tolerated.
    pub async fn call_json<T: DeserializeOwned>(
        &self,
        prompt: &str,
        system: &str,
        attachment: Option<&DocumentData>,
    ) -> Result<T, LlmError> {
        let response = self.call(prompt, system, attachment).await?;
        let text = response.text().ok_or(LlmError::EmptyContent)?;
        let payload = json_payload(&text);
        if payload.is_empty() {
            return Err(LlmError::EmptyContent);
        }
        serde_json::from_str(payload).map_err(LlmError::Parse)
    }
}

/// The JSON part of a model reply: the inside of a ``` fence if there is one,
/// otherwise the span from the first `{`/`[` to the last `}`/`]`.
fn json_payload(text: &str) -> &str {
    let text = text.trim();
    let unfenced = match text.strip_prefix("```") {
        Some(rest) => {
            let rest = rest.strip_prefix("json").unwrap_or(rest);
            rest.trim().strip_suffix("```").unwrap_or(rest).trim()
        }
        None => text,
    };

    let start = unfenced.find(|c: char| c == '{' || c == '[');
    let end = unfenced.rfind(|c: char| c == '}' || c == ']');
    match (start, end) {
        (Some(s), Some(e)) if s <= e => &unfenced[s..=e],
        _ => unfenced,
    }
}

#[cfg(test)]
impl LlmClient {
    fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}
