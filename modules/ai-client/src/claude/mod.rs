mod client;
pub(crate) mod types;

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::error::AiError;
use crate::traits::Completion;
use client::ClaudeClient;
use types::*;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

// =============================================================================
// Claude Agent
// =============================================================================

#[derive(Clone)]
pub struct Claude {
    api_key: String,
    pub(crate) model: String,
    base_url: Option<String>,
    timeout: Duration,
}

impl Claude {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub(crate) fn client(&self) -> Result<ClaudeClient, AiError> {
        let client = ClaudeClient::new(&self.api_key, self.timeout)?;
        Ok(if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        })
    }

    pub async fn chat_completion(
        &self,
        system: Option<&str>,
        user: impl Into<String>,
    ) -> Result<String, AiError> {
        let mut request = ChatRequest::new(&self.model)
            .message(WireMessage::user(user))
            .max_tokens(4096)
            .temperature(0.0);
        if let Some(system) = system {
            request = request.system(system);
        }

        let response = self.client()?.chat(&request).await?;
        response_text(response)
    }
}

/// Pull the generated text out of a response, surfacing refusals as typed errors.
pub(crate) fn response_text(response: ChatResponse) -> Result<String, AiError> {
    if response.stop_reason.as_deref() == Some("refusal") {
        warn!("Claude refused the request");
        return Err(AiError::Refusal("stop_reason: refusal".to_string()));
    }

    response
        .text()
        .ok_or_else(|| AiError::Api("No response from Claude".to_string()))
}

#[async_trait]
impl Completion for Claude {
    fn provider(&self) -> &'static str {
        "claude"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.chat_completion(None, prompt).await
    }
}
