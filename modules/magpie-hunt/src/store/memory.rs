// In-process sinks. Writes are serialized by a mutex per store.

use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;

use magpie_common::{AiContentLog, GeneratedHunt, HuntId, LogId, NewContentLog, NewHunt};

use super::{AuditLog, HuntStore};

fn poisoned<T>(_: T) -> anyhow::Error {
    anyhow!("store mutex poisoned")
}

// ---------------------------------------------------------------------------
// InMemoryHuntStore
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryHuntStore {
    inner: Mutex<HuntRows>,
}

#[derive(Default)]
struct HuntRows {
    next_id: HuntId,
    rows: Vec<GeneratedHunt>,
}

impl InMemoryHuntStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored hunts.
    pub fn len(&self) -> usize {
        self.inner.lock().map(|g| g.rows.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl HuntStore for InMemoryHuntStore {
    async fn insert(&self, hunt: NewHunt) -> Result<HuntId> {
        let mut guard = self.inner.lock().map_err(poisoned)?;
        guard.next_id += 1;
        let id = guard.next_id;
        guard.rows.push(GeneratedHunt::from_new(id, hunt, Utc::now()));
        Ok(id)
    }

    async fn update(&self, hunt: &GeneratedHunt) -> Result<()> {
        let mut guard = self.inner.lock().map_err(poisoned)?;
        let row = guard
            .rows
            .iter_mut()
            .find(|row| row.id == hunt.id)
            .ok_or_else(|| anyhow!("hunt {} not found", hunt.id))?;
        row.items = hunt.items.clone();
        row.is_complete = hunt.is_complete;
        row.last_played_at = hunt.last_played_at;
        row.completed_at = hunt.completed_at;
        Ok(())
    }

    async fn get_by_id(&self, id: HuntId) -> Result<Option<GeneratedHunt>> {
        let guard = self.inner.lock().map_err(poisoned)?;
        Ok(guard.rows.iter().find(|row| row.id == id).cloned())
    }

    async fn latest_incomplete(&self) -> Result<Option<GeneratedHunt>> {
        let guard = self.inner.lock().map_err(poisoned)?;
        Ok(guard
            .rows
            .iter()
            .filter(|row| !row.is_complete)
            .max_by_key(|row| (row.last_played_at, row.id))
            .cloned())
    }

    async fn list(&self) -> Result<Vec<GeneratedHunt>> {
        let guard = self.inner.lock().map_err(poisoned)?;
        Ok(guard.rows.iter().rev().cloned().collect())
    }

    async fn delete(&self, id: HuntId) -> Result<()> {
        let mut guard = self.inner.lock().map_err(poisoned)?;
        guard.rows.retain(|row| row.id != id);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// InMemoryAuditLog
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct InMemoryAuditLog {
    entries: Mutex<Vec<AiContentLog>>,
}

impl InMemoryAuditLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of every entry in append order.
    pub fn entries(&self) -> Vec<AiContentLog> {
        self.entries.lock().map(|g| g.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AuditLog for InMemoryAuditLog {
    async fn append(&self, entry: NewContentLog) -> Result<LogId> {
        let mut guard = self.entries.lock().map_err(poisoned)?;
        let id = guard.len() as LogId + 1;
        guard.push(AiContentLog::from_new(id, entry));
        Ok(id)
    }

    async fn mark_reported(&self, id: LogId, reason: &str) -> Result<bool> {
        let mut guard = self.entries.lock().map_err(poisoned)?;
        match guard.iter_mut().find(|entry| entry.id == id) {
            Some(entry) => {
                entry.user_reported = true;
                entry.report_reason = Some(reason.to_string());
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn reported(&self) -> Result<Vec<AiContentLog>> {
        let guard = self.entries.lock().map_err(poisoned)?;
        Ok(guard.iter().rev().filter(|e| e.user_reported).cloned().collect())
    }

    async fn by_location(&self, location: &str) -> Result<Vec<AiContentLog>> {
        let guard = self.entries.lock().map_err(poisoned)?;
        Ok(guard
            .iter()
            .rev()
            .filter(|e| e.location == location)
            .cloned()
            .collect())
    }
}
