// Persistence seams for the hunt pipeline.
//
// HuntStore holds accepted hunts and their found-state; AuditLog records every
// generation attempt for moderation review. The orchestrator only ever calls
// HuntStore::insert and AuditLog::append; the rest belongs to the game layer
// and the review workflow.

pub mod memory;
pub mod postgres;

pub use memory::{InMemoryAuditLog, InMemoryHuntStore};
pub use postgres::{migrate, PgAuditLog, PgHuntStore};

use anyhow::Result;
use async_trait::async_trait;

use magpie_common::{AiContentLog, GeneratedHunt, HuntId, LogId, NewContentLog, NewHunt};

// ---------------------------------------------------------------------------
// HuntStore
// ---------------------------------------------------------------------------

#[async_trait]
pub trait HuntStore: Send + Sync {
    /// Persist a newly generated hunt. Returns its id.
    async fn insert(&self, hunt: NewHunt) -> Result<HuntId>;

    /// Overwrite items, completion state and play timestamps of an existing hunt.
    async fn update(&self, hunt: &GeneratedHunt) -> Result<()>;

    async fn get_by_id(&self, id: HuntId) -> Result<Option<GeneratedHunt>>;

    /// The incomplete hunt played most recently (never-played hunts last).
    async fn latest_incomplete(&self) -> Result<Option<GeneratedHunt>>;

    /// All hunts, newest first.
    async fn list(&self) -> Result<Vec<GeneratedHunt>>;

    async fn delete(&self, id: HuntId) -> Result<()>;
}

// ---------------------------------------------------------------------------
// AuditLog
// ---------------------------------------------------------------------------

#[async_trait]
pub trait AuditLog: Send + Sync {
    /// Record one generation attempt. Returns the log id.
    async fn append(&self, entry: NewContentLog) -> Result<LogId>;

    /// Flag a logged attempt for human review. Returns false if no such entry.
    async fn mark_reported(&self, id: LogId, reason: &str) -> Result<bool>;

    /// Entries flagged by users, newest first.
    async fn reported(&self) -> Result<Vec<AiContentLog>>;

    /// Entries for one location, newest first.
    async fn by_location(&self, location: &str) -> Result<Vec<AiContentLog>>;
}
