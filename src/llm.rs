//! Chat-completion client abstraction and the OpenAI-compatible HTTP adapter.
//!
//! The orchestrator only sees the [`ChatClient`] trait, so tests can swap in
//! a scripted client. [`OpenAiClient`] talks to any endpoint that speaks the
//! `POST /v1/chat/completions` protocol.
//!
//! # Retry Strategy
//!
//! - HTTP 429 (rate limited) and 5xx (server error) → retry
//! - HTTP 4xx (client error, not 429) → fail immediately
//! - Network errors and timeouts → retry
//! - Backoff: base, 2×base, 4×base … (capped at 2^5 × base), base = 1s

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};

use crate::config::{LlmConfig, PricingConfig};
use crate::error::{Error, Result};

/// One chat-completion call: a system prompt plus a single user message.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Token counters reported by the provider.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: u64,
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub usage: TokenUsage,
}

/// A chat-completion backend.
#[async_trait]
pub trait ChatClient: Send + Sync {
    /// Model identifier sent with every request (e.g. `"gpt-4o-mini"`).
    fn model_name(&self) -> &str;

    /// Whether an API credential is configured.
    fn has_credential(&self) -> bool;

    async fn complete(&self, request: &ChatRequest) -> Result<Completion>;
}

/// Linear token pricing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub input_per_million: f64,
    pub output_per_million: f64,
}

impl Pricing {
    pub fn from_config(config: &PricingConfig) -> Self {
        Self {
            input_per_million: config.input_per_million,
            output_per_million: config.output_per_million,
        }
    }

    /// `prompt_tokens * price_in + completion_tokens * price_out`, in USD.
    pub fn cost(&self, usage: &TokenUsage) -> f64 {
        usage.prompt_tokens as f64 * self.input_per_million / 1_000_000.0
            + usage.completion_tokens as f64 * self.output_per_million / 1_000_000.0
    }
}

// ============ OpenAI-compatible client ============

#[derive(Serialize)]
struct RequestBody<'a> {
    model: &'a str,
    messages: [Message<'a>; 2],
    temperature: f32,
    max_completion_tokens: u32,
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ResponseBody {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    usage: TokenUsage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat client for OpenAI's API and compatible servers.
pub struct OpenAiClient {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_retries: u32,
    backoff_base: Duration,
}

impl OpenAiClient {
    /// Build a client from configuration. `api_key` may be `None`; calls then
    /// fail with [`Error::Config`].
    pub fn new(config: &LlmConfig, api_key: Option<String>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            model: config.model.clone(),
            api_key: api_key.filter(|k| !k.trim().is_empty()),
            max_retries: config.max_retries,
            backoff_base: Duration::from_secs(1),
        })
    }

    /// Override the first backoff delay.
    pub fn with_backoff_base(mut self, base: Duration) -> Self {
        self.backoff_base = base;
        self
    }

    async fn send_once(&self, api_key: &str, body: &RequestBody<'_>) -> Result<Completion> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", api_key))
            .header("Content-Type", "application/json")
            .json(body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(Error::Api {
                status: status.as_u16(),
                message: provider_error_message(&text, status),
            });
        }

        parse_completion(&text)
    }
}

#[async_trait]
impl ChatClient for OpenAiClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    fn has_credential(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, request: &ChatRequest) -> Result<Completion> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or_else(|| Error::Config("API key is not set".to_string()))?;

        let body = RequestBody {
            model: &self.model,
            messages: [
                Message {
                    role: "system",
                    content: &request.system,
                },
                Message {
                    role: "user",
                    content: &request.user,
                },
            ],
            temperature: request.temperature,
            max_completion_tokens: request.max_tokens,
        };

        let mut last_err = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = self.backoff_base * (1u32 << (attempt - 1).min(5));
                tokio::time::sleep(delay).await;
            }

            match self.send_once(api_key, &body).await {
                Ok(completion) => {
                    tracing::debug!(
                        model = %self.model,
                        prompt_tokens = completion.usage.prompt_tokens,
                        completion_tokens = completion.usage.completion_tokens,
                        "chat completion succeeded"
                    );
                    return Ok(completion);
                }
                Err(err) if is_retryable(&err) => {
                    tracing::warn!(attempt, error = %err, "chat completion failed, will retry");
                    last_err = Some(err);
                }
                Err(err) => return Err(err),
            }
        }

        Err(last_err
            .unwrap_or_else(|| Error::InvalidResponse("chat completion failed after retries".to_string())))
    }
}

fn is_retryable(err: &Error) -> bool {
    match err {
        Error::Api { status, .. } => *status == 429 || (500..600).contains(status),
        Error::Transport(_) => true,
        _ => false,
    }
}

fn parse_completion(text: &str) -> Result<Completion> {
    let body: ResponseBody = serde_json::from_str(text)
        .map_err(|e| Error::InvalidResponse(format!("undecodable completion: {}", e)))?;

    let choice = body
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| Error::InvalidResponse("completion has no choices".to_string()))?;

    Ok(Completion {
        content: choice.message.content.unwrap_or_default(),
        usage: body.usage,
    })
}

/// Human-readable message from an error response.
///
/// Uses the provider's `{"error": {"message", "type", "code"}}` envelope when
/// present, otherwise the HTTP status line.
pub fn provider_error_message(body: &str, status: StatusCode) -> String {
    let from_envelope = serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|json| {
            let error = json.get("error")?;
            let mut message = error.get("message")?.as_str()?.to_string();
            if let Some(kind) = error.get("type").and_then(|t| t.as_str()) {
                message.push_str(&format!(" (type: {})", kind));
            }
            match error.get("code") {
                Some(serde_json::Value::String(code)) => message.push_str(&format!(" [code: {}]", code)),
                Some(serde_json::Value::Number(code)) => message.push_str(&format!(" [code: {}]", code)),
                _ => {}
            }
            Some(message)
        });

    from_envelope.unwrap_or_else(|| status.to_string())
}
