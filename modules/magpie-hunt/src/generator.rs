use std::sync::Arc;

use ai_client::{AiError, Completion};
use async_trait::async_trait;
use thiserror::Error;
use tracing::{debug, warn};

/// Why a generation call produced no text.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Provider unreachable, rate limited, or answered with an error status.
    #[error("transport error: {0}")]
    Transport(String),

    /// The provider's own safety system blocked the request.
    #[error("provider refused request: {0}")]
    ProviderRefusal(String),
}

impl From<AiError> for GenerationError {
    fn from(e: AiError) -> Self {
        match e {
            AiError::Refusal(reason) => GenerationError::ProviderRefusal(reason),
            other => GenerationError::Transport(other.to_string()),
        }
    }
}

/// Prompt for `item_count` hunt items at `location`.
///
/// The wording is the first safety layer: it names the audience, lists the
/// forbidden categories explicitly and pins the output to a bare JSON array.
pub fn build_hunt_prompt(location: &str, item_count: u32) -> String {
    format!(
        r#"You are creating a family-friendly scavenger hunt for children aged 5-12.

CRITICAL SAFETY REQUIREMENTS:
- ALL content MUST be age-appropriate and educational
- NO violence, weapons, dangerous activities, or adult themes
- NO references to drugs, alcohol, or harmful substances
- NO hate speech, insults, or discriminatory language
- NO scary, frightening, or disturbing content
- Focus on nature, landmarks, architecture, and cultural items
- Use simple, child-friendly language

Generate exactly {item_count} scavenger hunt items for: {location}

Format your response as a JSON array with exactly {item_count} objects shaped like this:
[
  {{"name": "Item Name", "funFact": "An interesting, educational fact about this item"}},
  ...
]

Return ONLY the JSON array, no other text."#
    )
}

/// Source of raw hunt text for a location.
#[async_trait]
pub trait ContentGenerator: Send + Sync {
    /// The exact prompt `generate` sends for these inputs.
    fn prompt(&self, location: &str, item_count: u32) -> String {
        build_hunt_prompt(location, item_count)
    }

    async fn generate(&self, location: &str, item_count: u32) -> Result<String, GenerationError>;
}

/// [`ContentGenerator`] backed by a hosted model from `ai-client`.
#[derive(Clone)]
pub struct AiContentGenerator {
    model: Arc<dyn Completion>,
}

impl AiContentGenerator {
    pub fn new(model: Arc<dyn Completion>) -> Self {
        Self { model }
    }
}

#[async_trait]
impl ContentGenerator for AiContentGenerator {
    async fn generate(&self, location: &str, item_count: u32) -> Result<String, GenerationError> {
        let prompt = self.prompt(location, item_count);

        debug!(
            provider = self.model.provider(),
            model = self.model.model(),
            location,
            item_count,
            "Requesting hunt items"
        );

        self.model.complete(&prompt).await.map_err(|e| {
            warn!(
                provider = self.model.provider(),
                location,
                error = %e,
                "Hunt generation call failed"
            );
            GenerationError::from(e)
        })
    }
}
