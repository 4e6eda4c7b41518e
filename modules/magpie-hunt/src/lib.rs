//! Hunt generation pipeline.
//!
//! prompt → [`ContentGenerator`] → [`ResponseParser`] → `SafetyValidator` →
//! [`HuntStore`] / [`AuditLog`], driven by [`HuntGenerator`].

pub mod generator;
pub mod orchestrator;
pub mod parser;
pub mod progress;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use generator::{build_hunt_prompt, AiContentGenerator, ContentGenerator, GenerationError};
pub use orchestrator::{GenerationResult, HuntGenerator};
pub use parser::ResponseParser;
pub use progress::HuntProgress;
pub use store::{AuditLog, HuntStore};
