//! LLM client: the single point of entry for all language-model calls.
//!
//! ARCHITECTURAL RULE: No other module may call the model provider directly.
//! Question generation and both evaluators go through `LanguageModel`.
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::errors::{Capability, UpstreamError};

pub mod prompts;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const MAX_TOKENS: u32 = 2048;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Black-box text generation capability: prompt in, free text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    async fn generate_content(&self, prompt: &str) -> Result<String, UpstreamError>;
}

#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct LlmResponse {
    pub content: Vec<ContentBlock>,
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
    /// Extracts the text content from the first text block.
    pub fn text(&self) -> Option<&str> {
        self.content
            .iter()
            .find(|b| b.block_type == "text")
            .and_then(|b| b.text.as_deref())
    }
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
struct AnthropicErrorBody {
    #[serde(rename = "type", default)]
    error_type: String,
    message: String,
}

/// Wraps the Anthropic Messages API. Constructed once in `main` from `LlmConfig`.
///
/// No retry loop: failures go straight back to the caller.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> anyhow::Result<Self> {
        Ok(Self {
            client: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            config,
        })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Makes a raw call to the Messages API, returning the full response object.
    pub async fn call(&self, prompt: &str, system: &str) -> Result<LlmResponse, UpstreamError> {
        let request_body = AnthropicRequest {
            model: &self.config.model,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
        };

        let response = self
            .client
            .post(ANTHROPIC_API_URL)
            .header("x-api-key", &self.config.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&request_body)
            .send()
            .await
            .map_err(|e| UpstreamError::Network {
                service: Capability::LanguageModel,
                detail: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM API returned {}: {}", status, body);
            return Err(classify_failure(status.as_u16(), &body));
        }

        let llm_response: LlmResponse =
            response.json().await.map_err(|e| UpstreamError::Rejected {
                service: Capability::LanguageModel,
                status: status.as_u16(),
                detail: format!("undecodable response body: {e}"),
            })?;

        debug!(
            "LLM call succeeded: input_tokens={}, output_tokens={}",
            llm_response.usage.input_tokens, llm_response.usage.output_tokens
        );

        Ok(llm_response)
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn generate_content(&self, prompt: &str) -> Result<String, UpstreamError> {
        let response = self.call(prompt, prompts::INTERVIEWER_SYSTEM).await?;
        let text = response.text().ok_or(UpstreamError::EmptyResponse {
            service: Capability::LanguageModel,
        })?;
        Ok(strip_code_fences(text).to_string())
    }
}

/// Maps a non-2xx provider response to the cause the user can act on.
fn classify_failure(status: u16, body: &str) -> UpstreamError {
    let service = Capability::LanguageModel;
    let parsed = serde_json::from_str::<AnthropicError>(body).ok();
    let lowered = body.to_lowercase();

    if matches!(status, 401 | 403) {
        return UpstreamError::InvalidCredentials { service };
    }
    if lowered.contains("credit balance") || lowered.contains("quota") || lowered.contains("billing")
    {
        return UpstreamError::QuotaExceeded { service };
    }

    match status {
        429 => UpstreamError::RateLimited { service },
        500..=599 => UpstreamError::Unavailable { service, status },
        _ => UpstreamError::Rejected {
            service,
            status,
            detail: parsed
                .map(|e| format!("{}: {}", e.error.error_type, e.error.message))
                .unwrap_or_else(|| body.to_string()),
        },
    }
}

/// Strips ```lang ... ``` or ``` ... ``` fences some models wrap around templated output.
fn strip_code_fences(text: &str) -> &str {
    let text = text.trim();
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    // Drop an optional language tag on the opening fence line.
    let rest = match rest.find('\n') {
        Some(idx) if !rest[..idx].trim().contains(' ') => &rest[idx + 1..],
        _ => rest,
    };
    rest.trim_end()
        .strip_suffix("```")
        .unwrap_or(rest)
        .trim()
}
