use async_trait::async_trait;

use crate::error::AiError;

// =============================================================================
// Completion Trait
// =============================================================================

/// Single-shot text generation against a hosted model.
#[async_trait]
pub trait Completion: Send + Sync {
    /// Provider name used in logs ("gemini", "claude").
    fn provider(&self) -> &'static str;

    fn model(&self) -> &str;

    /// Send `prompt` as a single user turn and return the generated text.
    async fn complete(&self, prompt: &str) -> Result<String, AiError>;
}
