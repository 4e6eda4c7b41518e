//! Provider clients for generative text models.
//!
//! Each provider implements [`Completion`]: one prompt in, generated text out.
//! Failures are typed so callers can tell a provider-side safety refusal
//! ([`AiError::Refusal`]) apart from transport and API errors.

pub mod claude;
pub mod error;
pub mod gemini;
pub mod traits;
pub mod util;

pub use claude::Claude;
pub use error::AiError;
pub use gemini::{Gemini, HarmBlockThreshold, HarmCategory, SafetySetting};
pub use traits::Completion;
pub use util::{strip_code_fences, truncate_to_char_boundary};
