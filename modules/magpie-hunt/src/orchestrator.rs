use std::sync::Arc;

use ai_client::truncate_to_char_boundary;
use chrono::Utc;
use serde::Serialize;
use tracing::{error, info, warn};

use magpie_common::{
    Difficulty, HuntId, HuntItem, HuntRequest, NewContentLog, NewHunt, SafetyValidator,
};

use crate::generator::{ContentGenerator, GenerationError};
use crate::parser::ResponseParser;
use crate::store::{AuditLog, HuntStore};

/// Outcome of one generation attempt. Exactly one variant per call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum GenerationResult {
    Success {
        #[serde(rename = "huntId")]
        hunt_id: HuntId,
        items: Vec<HuntItem>,
    },
    /// The local safety check rejected the content.
    SafetyRejected { reason: String },
    /// Nothing usable came back, or the hunt could not be saved.
    GenerationFailed { reason: String },
}

impl GenerationResult {
    /// Only safety rejections are queued for moderation.
    pub fn requires_review(&self) -> bool {
        matches!(self, GenerationResult::SafetyRejected { .. })
    }

    pub fn is_success(&self) -> bool {
        matches!(self, GenerationResult::Success { .. })
    }
}

/// Drives one hunt through generation, parsing, validation and persistence.
///
/// Every call appends exactly one audit entry and inserts a hunt only when the
/// content passed the safety check. Collaborators are injected so the pipeline
/// can run against mocks, in-memory sinks or Postgres without change.
#[derive(Clone)]
pub struct HuntGenerator {
    pipeline: Arc<Pipeline>,
}

struct Pipeline {
    generator: Arc<dyn ContentGenerator>,
    validator: SafetyValidator,
    parser: ResponseParser,
    hunts: Arc<dyn HuntStore>,
    audit: Arc<dyn AuditLog>,
}

/// Inputs of one call, carried into the post-response phase.
struct Attempt {
    location: String,
    item_count: u32,
    difficulty: Difficulty,
    prompt: String,
}

impl Attempt {
    fn log(
        &self,
        response: impl Into<String>,
        items_generated: u32,
        safety_check_passed: bool,
        flagged_content: Option<String>,
    ) -> NewContentLog {
        NewContentLog {
            location: self.location.clone(),
            prompt: self.prompt.clone(),
            response: response.into(),
            items_generated,
            safety_check_passed,
            flagged_content,
            timestamp: Utc::now(),
        }
    }
}

impl HuntGenerator {
    pub fn new(
        generator: Arc<dyn ContentGenerator>,
        validator: SafetyValidator,
        parser: ResponseParser,
        hunts: Arc<dyn HuntStore>,
        audit: Arc<dyn AuditLog>,
    ) -> Self {
        Self {
            pipeline: Arc::new(Pipeline {
                generator,
                validator,
                parser,
                hunts,
                audit,
            }),
        }
    }

    /// Run the pipeline for a request whose preconditions were already checked.
    pub async fn generate(&self, request: &HuntRequest) -> GenerationResult {
        self.generate_hunt_for_location(&request.location, request.item_count, request.difficulty)
            .await
    }

    /// Generate, validate and persist a hunt for `location`.
    ///
    /// Never fails: every fault is folded into a [`GenerationResult`]. The
    /// provider call is the only await before any write. Dropping the future
    /// while it is pending writes nothing; once the response is in, the
    /// remaining steps run on their own task and finish regardless.
    pub async fn generate_hunt_for_location(
        &self,
        location: &str,
        item_count: u32,
        difficulty: Difficulty,
    ) -> GenerationResult {
        let attempt = Attempt {
            location: location.to_string(),
            item_count,
            difficulty,
            prompt: self.pipeline.generator.prompt(location, item_count),
        };

        info!(location, item_count, difficulty = %difficulty, "Generating hunt");

        let response = self.pipeline.generator.generate(location, item_count).await;

        let pipeline = self.pipeline.clone();
        let finish = tokio::spawn(async move { pipeline.finish(attempt, response).await });

        match finish.await {
            Ok(result) => result,
            Err(e) => {
                error!(location, error = %e, "Hunt pipeline task failed");
                GenerationResult::GenerationFailed {
                    reason: format!("internal error: {e}"),
                }
            }
        }
    }
}

impl Pipeline {
    async fn finish(
        &self,
        attempt: Attempt,
        response: Result<String, GenerationError>,
    ) -> GenerationResult {
        let raw = match response {
            Ok(raw) => raw,
            Err(e) => {
                warn!(location = attempt.location.as_str(), error = %e, "Hunt generation failed");
                self.record(attempt.log("", 0, false, None)).await;
                return GenerationResult::GenerationFailed {
                    reason: e.to_string(),
                };
            }
        };

        let candidates = self.parser.parse(&raw);
        if candidates.is_empty() {
            warn!(
                location = attempt.location.as_str(),
                response_len = raw.len(),
                preview = truncate_to_char_boundary(&raw, 160),
                "No hunt items in model response"
            );
            self.record(attempt.log(raw, 0, false, None)).await;
            return GenerationResult::GenerationFailed {
                reason: "No items could be parsed from the AI response".to_string(),
            };
        }

        let candidate_count = candidates.len() as u32;
        let validation = self
            .validator
            .validate_items(candidates.iter().map(|c| c.validation_text()));

        if !validation.is_safe {
            let reason = validation
                .reason
                .unwrap_or_else(|| "Content failed safety check".to_string());
            warn!(
                location = attempt.location.as_str(),
                flagged = ?validation.flagged_terms,
                "Hunt content rejected by safety check"
            );
            self.record(attempt.log(raw, candidate_count, false, Some(reason.clone())))
                .await;
            return GenerationResult::SafetyRejected { reason };
        }

        if candidate_count != attempt.item_count {
            warn!(
                location = attempt.location.as_str(),
                requested = attempt.item_count,
                received = candidate_count,
                "Model returned a different number of items than requested"
            );
        }

        // Every validated item is kept; item_count stays the requested size.
        let items: Vec<HuntItem> = candidates
            .into_iter()
            .zip(1u32..)
            .map(|(candidate, id)| HuntItem::new(id, candidate.name, candidate.fun_fact))
            .collect();

        let inserted = self
            .hunts
            .insert(NewHunt {
                location: attempt.location.clone(),
                difficulty: attempt.difficulty,
                item_count: attempt.item_count,
                items: items.clone(),
            })
            .await;

        self.record(attempt.log(raw, candidate_count, true, None)).await;

        match inserted {
            Ok(hunt_id) => {
                info!(
                    location = attempt.location.as_str(),
                    hunt_id,
                    items = candidate_count,
                    "Hunt generated"
                );
                GenerationResult::Success { hunt_id, items }
            }
            Err(e) => {
                error!(location = attempt.location.as_str(), error = %e, "Failed to save hunt");
                GenerationResult::GenerationFailed {
                    reason: format!("Failed to save hunt: {e}"),
                }
            }
        }
    }

    async fn record(&self, entry: NewContentLog) {
        let location = entry.location.clone();
        let passed = entry.safety_check_passed;
        if let Err(e) = self.audit.append(entry).await {
            error!(
                location = location.as_str(),
                safety_check_passed = passed,
                error = %e,
                "Failed to append audit log entry"
            );
        }
    }
}
