//! KrishiMitra farming assistant: wraps a user message in the assistant
//! persona and relays it to the configured chat provider.

use super::providers::{ChatMessage, ChatProvider, CompletionParams, ProviderError};
use std::sync::Arc;
use std::time::Instant;

pub const SYSTEM_PROMPT: &str = "You are KrishiMitra, an AI-powered digital farming assistant. \
Provide short, helpful, and friendly answers about agriculture, crop prices, soil health, \
pest control, and weather.";

#[derive(Clone)]
pub struct FarmingAssistant {
    provider: Arc<dyn ChatProvider>,
    params: CompletionParams,
}

impl FarmingAssistant {
    pub fn new(provider: Arc<dyn ChatProvider>, params: CompletionParams) -> Self {
        Self { provider, params }
    }

    /// Build the two-message conversation sent upstream.
    pub fn conversation(message: &str) -> [ChatMessage; 2] {
        [ChatMessage::system(SYSTEM_PROMPT), ChatMessage::user(message)]
    }

    /// Ask the assistant a single stateless question.
    pub async fn reply(&self, message: &str) -> Result<String, ProviderError> {
        let messages = Self::conversation(message);
        let start = Instant::now();

        let result = self.provider.complete(&messages, &self.params).await;

        metrics::histogram!("chat_upstream_duration_seconds")
            .record(start.elapsed().as_secs_f64());

        let completion = result.inspect_err(|e| {
            metrics::counter!("chat_requests_total", "outcome" => e.kind()).increment(1);
        })?;
        metrics::counter!("chat_requests_total", "outcome" => "ok").increment(1);

        tracing::info!(
            model = %self.provider.model(),
            prompt_tokens = ?completion.prompt_tokens,
            completion_tokens = ?completion.completion_tokens,
            finish_reason = ?completion.finish_reason,
            "Chat completion received"
        );

        Ok(completion.content.trim().to_string())
    }
}
