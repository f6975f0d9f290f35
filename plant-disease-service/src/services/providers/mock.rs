//! Mock chat provider for testing.

use super::{ChatCompletion, ChatMessage, ChatProvider, CompletionParams, ProviderError};
use async_trait::async_trait;
use std::sync::Mutex;

/// Mock chat provider that echoes the last user message, or fails on demand.
pub struct MockChatProvider {
    failure: Option<fn() -> ProviderError>,
    last_request: Mutex<Option<(Vec<ChatMessage>, CompletionParams)>>,
}

impl MockChatProvider {
    pub fn new() -> Self {
        Self {
            failure: None,
            last_request: Mutex::new(None),
        }
    }

    /// Fail every call with the error built by `make_error`.
    pub fn failing(make_error: fn() -> ProviderError) -> Self {
        Self {
            failure: Some(make_error),
            last_request: Mutex::new(None),
        }
    }

    /// Messages and parameters of the most recent call.
    pub fn last_request(&self) -> Option<(Vec<ChatMessage>, CompletionParams)> {
        self.last_request.lock().ok().and_then(|guard| guard.clone())
    }
}

impl Default for MockChatProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatProvider for MockChatProvider {
    fn model(&self) -> &str {
        "mock-chat"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        params: &CompletionParams,
    ) -> Result<ChatCompletion, ProviderError> {
        if let Ok(mut guard) = self.last_request.lock() {
            *guard = Some((messages.to_vec(), params.clone()));
        }

        if let Some(make_error) = self.failure {
            return Err(make_error());
        }

        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == super::Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        Ok(ChatCompletion {
            content: format!("  Mock response for: {}\n", prompt),
            prompt_tokens: Some(prompt.len() as u32 / 4),
            completion_tokens: Some(5),
            finish_reason: Some("stop".to_string()),
        })
    }
}
