mod client;
pub(crate) mod types;

pub use types::{HarmBlockThreshold, HarmCategory, SafetySetting};

use async_trait::async_trait;
use std::time::Duration;
use tracing::warn;

use crate::error::AiError;
use crate::traits::Completion;
use client::GeminiClient;
use types::*;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);

/// Finish reasons that mean the provider withheld the output on safety grounds.
const BLOCKING_FINISH_REASONS: &[&str] = &["SAFETY", "PROHIBITED_CONTENT", "BLOCKLIST", "SPII"];

// =============================================================================
// Gemini Agent
// =============================================================================

#[derive(Clone)]
pub struct Gemini {
    api_key: String,
    pub(crate) model: String,
    safety_settings: Vec<SafetySetting>,
    base_url: Option<String>,
    timeout: Duration,
}

impl Gemini {
    /// New client with every harm category blocked at medium probability and above.
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            safety_settings: Self::default_safety_settings(),
            base_url: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn default_safety_settings() -> Vec<SafetySetting> {
        [
            HarmCategory::Harassment,
            HarmCategory::HateSpeech,
            HarmCategory::SexuallyExplicit,
            HarmCategory::DangerousContent,
        ]
        .into_iter()
        .map(|category| SafetySetting::new(category, HarmBlockThreshold::BlockMediumAndAbove))
        .collect()
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn safety_settings(&self) -> &[SafetySetting] {
        &self.safety_settings
    }

    pub(crate) fn client(&self) -> Result<GeminiClient, AiError> {
        let client = GeminiClient::new(&self.api_key, self.timeout)?;
        Ok(if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        })
    }

    pub async fn generate_content(&self, prompt: impl Into<String>) -> Result<String, AiError> {
        let request = GenerateRequest {
            contents: vec![Content::user(prompt)],
            safety_settings: self.safety_settings.clone(),
            generation_config: GenerationConfig {
                temperature: Some(0.7),
                max_output_tokens: Some(4096),
            },
        };

        let response = self.client()?.generate(&self.model, &request).await?;
        response_text(response)
    }
}

/// Pull the generated text out of a response, surfacing safety blocks as typed errors.
pub(crate) fn response_text(response: GenerateResponse) -> Result<String, AiError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.as_deref())
    {
        warn!(block_reason = reason, "Gemini blocked the prompt");
        return Err(AiError::Refusal(format!("prompt blocked: {reason}")));
    }

    if let Some(reason) = response
        .candidates
        .first()
        .and_then(|c| c.finish_reason.as_deref())
        .filter(|r| BLOCKING_FINISH_REASONS.contains(r))
    {
        warn!(finish_reason = reason, "Gemini withheld the response");
        return Err(AiError::Refusal(format!("response blocked: {reason}")));
    }

    response
        .text()
        .ok_or_else(|| AiError::Api("No response from Gemini".to_string()))
}

#[async_trait]
impl Completion for Gemini {
    fn provider(&self) -> &'static str {
        "gemini"
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: &str) -> Result<String, AiError> {
        self.generate_content(prompt).await
    }
}
