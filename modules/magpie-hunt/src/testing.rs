// Test doubles for the hunt pipeline.
//
// One mock per trait boundary:
// - MockGenerator (ContentGenerator): scripted reply, call counting, optional delay,
//   optional notification once the reply is handed back
// - FailingHuntStore (HuntStore): every call errors
// - FailingAuditLog (AuditLog): every call errors
//
// Plus fixtures for model output and item lists.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{bail, Result};
use async_trait::async_trait;
use tokio::sync::Notify;

use magpie_common::{AiContentLog, GeneratedHunt, HuntId, HuntItem, LogId, NewContentLog, NewHunt};

use crate::generator::{ContentGenerator, GenerationError};
use crate::store::{AuditLog, HuntStore};

// ---------------------------------------------------------------------------
// MockGenerator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
enum Reply {
    Text(String),
    Transport(String),
    Refusal(String),
}

/// Generator that returns the same scripted reply on every call.
pub struct MockGenerator {
    reply: Reply,
    delay: Option<Duration>,
    responded: Option<Arc<Notify>>,
    calls: AtomicUsize,
    requests: Mutex<Vec<(String, u32)>>,
}

impl MockGenerator {
    fn with_reply(reply: Reply) -> Self {
        Self {
            reply,
            delay: None,
            responded: None,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Replies with `text` verbatim.
    pub fn replying(text: impl Into<String>) -> Self {
        Self::with_reply(Reply::Text(text.into()))
    }

    /// Fails with a transport error carrying `message`.
    pub fn transport_error(message: impl Into<String>) -> Self {
        Self::with_reply(Reply::Transport(message.into()))
    }

    /// Fails as if the provider's own filter blocked the prompt.
    pub fn refusing(reason: impl Into<String>) -> Self {
        Self::with_reply(Reply::Refusal(reason.into()))
    }

    /// Sleep before answering, to simulate a slow provider.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Notify `responded` as the reply is returned to the caller.
    pub fn signalling(mut self, responded: Arc<Notify>) -> Self {
        self.responded = Some(responded);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// `(location, item_count)` of every call, in order.
    pub fn requests(&self) -> Vec<(String, u32)> {
        self.requests.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl ContentGenerator for MockGenerator {
    async fn generate(&self, location: &str, item_count: u32) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push((location.to_string(), item_count));
        }

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if let Some(responded) = &self.responded {
            responded.notify_one();
        }

        match &self.reply {
            Reply::Text(text) => Ok(text.clone()),
            Reply::Transport(message) => Err(GenerationError::Transport(message.clone())),
            Reply::Refusal(reason) => Err(GenerationError::ProviderRefusal(reason.clone())),
        }
    }
}

// ---------------------------------------------------------------------------
// Failing sinks
// ---------------------------------------------------------------------------

/// Hunt store whose backend is down.
#[derive(Default)]
pub struct FailingHuntStore;

#[async_trait]
impl HuntStore for FailingHuntStore {
    async fn insert(&self, _hunt: NewHunt) -> Result<HuntId> {
        bail!("hunt store unavailable")
    }

    async fn update(&self, _hunt: &GeneratedHunt) -> Result<()> {
        bail!("hunt store unavailable")
    }

    async fn get_by_id(&self, _id: HuntId) -> Result<Option<GeneratedHunt>> {
        bail!("hunt store unavailable")
    }

    async fn latest_incomplete(&self) -> Result<Option<GeneratedHunt>> {
        bail!("hunt store unavailable")
    }

    async fn list(&self) -> Result<Vec<GeneratedHunt>> {
        bail!("hunt store unavailable")
    }

    async fn delete(&self, _id: HuntId) -> Result<()> {
        bail!("hunt store unavailable")
    }
}

/// Audit log whose backend is down.
#[derive(Default)]
pub struct FailingAuditLog;

#[async_trait]
impl AuditLog for FailingAuditLog {
    async fn append(&self, _entry: NewContentLog) -> Result<LogId> {
        bail!("audit log unavailable")
    }

    async fn mark_reported(&self, _id: LogId, _reason: &str) -> Result<bool> {
        bail!("audit log unavailable")
    }

    async fn reported(&self) -> Result<Vec<AiContentLog>> {
        bail!("audit log unavailable")
    }

    async fn by_location(&self, _location: &str) -> Result<Vec<AiContentLog>> {
        bail!("audit log unavailable")
    }
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Name of the `i`th item in [`safe_response`] (1-based).
pub fn landmark_name(i: usize) -> String {
    format!("Landmark {i}")
}

/// A fenced JSON array of `n` items that pass the safety check.
pub fn safe_response(n: usize) -> String {
    let objects: Vec<String> = (1..=n)
        .map(|i| {
            format!(
                "  {{\"name\": \"{}\", \"funFact\": \"Landmark {i} is a lovely place to visit.\"}}",
                landmark_name(i)
            )
        })
        .collect();
    format!("```json\n[\n{}\n]\n```", objects.join(",\n"))
}

/// Three items, the second of which mentions a weapon.
pub fn unsafe_response() -> String {
    r#"[
  {"name": "Bandstand", "funFact": "Music is played here on Sundays."},
  {"name": "Old Armoury", "funFact": "Holds a weapon from long ago."},
  {"name": "Duck Pond", "funFact": "Ducks paddle here all year."}
]"#
    .to_string()
}

/// Prose with no parseable items.
pub fn prose_response() -> String {
    "I'm sorry, I can't put together a list for that place right now.".to_string()
}

/// `n` fresh, unfound items numbered `1..=n`.
pub fn sample_items(n: u32) -> Vec<HuntItem> {
    (1..=n)
        .map(|i| {
            HuntItem::new(
                i,
                landmark_name(i as usize),
                format!("Landmark {i} is a lovely place to visit."),
            )
        })
        .collect()
}
