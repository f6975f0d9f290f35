//! Groq chat completion provider.
//!
//! Talks to the OpenAI-compatible `/chat/completions` endpoint with bearer
//! authentication. The response shape is validated before extraction.

use super::{ChatCompletion, ChatMessage, ChatProvider, CompletionParams, ProviderError};
use crate::config::GroqConfig;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Upstream error bodies are truncated to this many bytes in logs.
const MAX_LOGGED_BODY: usize = 512;

/// Groq provider.
pub struct GroqChatProvider {
    api_key: Secret<String>,
    endpoint: String,
    model: String,
    client: Client,
}

impl GroqChatProvider {
    pub fn new(config: &GroqConfig) -> Result<Self, ProviderError> {
        if config.api_key.expose_secret().is_empty() {
            return Err(ProviderError::NotConfigured(
                "Groq API key not configured".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.timeout.min(Duration::from_secs(10)))
            .build()
            .map_err(|e| ProviderError::NotConfigured(format!("HTTP client: {}", e)))?;

        Ok(Self {
            api_key: config.api_key.clone(),
            endpoint: format!("{}/chat/completions", config.base_url),
            model: config.model.clone(),
            client,
        })
    }
}

#[async_trait]
impl ChatProvider for GroqChatProvider {
    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ChatCompletion, ProviderError> {
        let request = ChatCompletionRequest {
            model: &self.model,
            messages,
            temperature: params.temperature,
            max_tokens: params.max_tokens,
        };

        tracing::debug!(
            model = %self.model,
            message_count = messages.len(),
            "Sending request to Groq API"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(map_transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(
                status = status.as_u16(),
                body = %truncate(&body, MAX_LOGGED_BODY),
                "Groq API returned an error"
            );

            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(ProviderError::RateLimited);
            }
            return Err(ProviderError::ApiError {
                status: status.as_u16(),
                message: status
                    .canonical_reason()
                    .unwrap_or("upstream error")
                    .to_string(),
            });
        }

        let body = response.bytes().await.map_err(map_transport_error)?;
        parse_completion(&body)
    }
}

fn map_transport_error(err: reqwest::Error) -> ProviderError {
    if err.is_timeout() {
        ProviderError::Timeout
    } else {
        ProviderError::NetworkError(err.to_string())
    }
}

/// Extract the first choice from a raw completion body.
fn parse_completion(body: &[u8]) -> Result<ChatCompletion, ProviderError> {
    let parsed: ChatCompletionResponse = serde_json::from_slice(body)
        .map_err(|e| ProviderError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    let choices = parsed
        .choices
        .ok_or_else(|| ProviderError::MalformedResponse("missing `choices`".to_string()))?;
    let first = choices
        .into_iter()
        .next()
        .ok_or_else(|| ProviderError::MalformedResponse("empty `choices`".to_string()))?;
    let content = first
        .message
        .and_then(|m| m.content)
        .ok_or_else(|| ProviderError::MalformedResponse("missing message content".to_string()))?;

    let usage = parsed.usage.unwrap_or_default();

    Ok(ChatCompletion {
        content,
        prompt_tokens: usage.prompt_tokens,
        completion_tokens: usage.completion_tokens,
        finish_reason: first.finish_reason,
    })
}

fn truncate(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut end = max;
    while !s.is_char_boundary(end) {
        end -= 1;
    }
    &s[..end]
}

// ============================================================================
// Groq API Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Option<Vec<Choice>>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    #[serde(default)]
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct Usage {
    prompt_tokens: Option<u32>,
    completion_tokens: Option<u32>,
}
