use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info};

use magpie_common::{GeneratedHunt, HuntId, HuntItem, MagpieError};

use crate::store::HuntStore;

fn storage(e: anyhow::Error) -> MagpieError {
    MagpieError::Storage(format!("{e:#}"))
}

/// Player-side found-state of persisted hunts.
///
/// The generation pipeline never touches `is_found`; this is the only writer.
#[derive(Clone)]
pub struct HuntProgress {
    store: Arc<dyn HuntStore>,
}

impl HuntProgress {
    pub fn new(store: Arc<dyn HuntStore>) -> Self {
        Self { store }
    }

    /// Mark one item found. Marking an already-found item only bumps
    /// `last_played_at`.
    pub async fn mark_found(&self, hunt_id: HuntId, item_id: u32) -> Result<GeneratedHunt, MagpieError> {
        let hunt = self.load(hunt_id).await?;

        let mut items = hunt.items.clone();
        let item = items
            .iter_mut()
            .find(|item| item.id == item_id)
            .ok_or(MagpieError::ItemNotFound { hunt_id, item_id })?;
        item.is_found = true;

        self.save(hunt, items).await
    }

    /// Replace the whole found-state, as the game grid reports it.
    ///
    /// `items` must be the hunt's own item list; only the found flags are
    /// taken from it.
    pub async fn record_progress(
        &self,
        hunt_id: HuntId,
        items: Vec<HuntItem>,
    ) -> Result<GeneratedHunt, MagpieError> {
        let hunt = self.load(hunt_id).await?;
        let items = hunt.merge_found_state(&items)?;
        self.save(hunt, items).await
    }

    /// The hunt a returning player should continue, if any.
    pub async fn resume_latest(&self) -> Result<Option<GeneratedHunt>, MagpieError> {
        self.store.latest_incomplete().await.map_err(storage)
    }

    async fn load(&self, hunt_id: HuntId) -> Result<GeneratedHunt, MagpieError> {
        self.store
            .get_by_id(hunt_id)
            .await
            .map_err(storage)?
            .ok_or(MagpieError::HuntNotFound(hunt_id))
    }

    async fn save(
        &self,
        mut hunt: GeneratedHunt,
        items: Vec<HuntItem>,
    ) -> Result<GeneratedHunt, MagpieError> {
        let was_complete = hunt.is_complete;
        hunt.apply_progress(items, Utc::now());
        self.store.update(&hunt).await.map_err(storage)?;

        if hunt.is_complete && !was_complete {
            info!(hunt_id = hunt.id, location = hunt.location.as_str(), "Hunt completed");
        } else {
            debug!(
                hunt_id = hunt.id,
                found = hunt.found_count(),
                total = hunt.items.len(),
                "Hunt progress saved"
            );
        }
        Ok(hunt)
    }
}
