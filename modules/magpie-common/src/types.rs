use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::MagpieError;

pub type HuntId = i64;
pub type LogId = i64;

// --- Enums ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Difficulty {
    Toddler,
    #[default]
    Explorer,
    Expert,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Toddler => "TODDLER",
            Difficulty::Explorer => "EXPLORER",
            Difficulty::Expert => "EXPERT",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = MagpieError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "TODDLER" => Ok(Difficulty::Toddler),
            "EXPLORER" => Ok(Difficulty::Explorer),
            "EXPERT" => Ok(Difficulty::Expert),
            other => Err(MagpieError::InvalidRequest(format!(
                "unknown difficulty: {other}"
            ))),
        }
    }
}

// --- Grid presets ---

/// Square board sizes offered when setting up a hunt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridSize {
    pub side: u32,
}

impl GridSize {
    pub const PRESETS: [GridSize; 5] = [
        GridSize { side: 2 },
        GridSize { side: 3 },
        GridSize { side: 4 },
        GridSize { side: 5 },
        GridSize { side: 6 },
    ];

    pub const DEFAULT: GridSize = GridSize { side: 3 };

    pub fn item_count(&self) -> u32 {
        self.side * self.side
    }

    /// Display label, e.g. "3×3".
    pub fn label(&self) -> String {
        format!("{0}×{0}", self.side)
    }

    /// The preset whose board holds exactly `count` items.
    pub fn for_item_count(count: u32) -> Option<GridSize> {
        Self::PRESETS.into_iter().find(|g| g.item_count() == count)
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::DEFAULT
    }
}

// --- Hunt items ---

/// One square of the hunt grid.
///
/// Field names on the wire are camelCase (`imageUrl`, `funFact`, `isFound`) so
/// stored item lists stay readable by the game client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HuntItem {
    pub id: u32,
    pub name: String,
    pub image_url: String,
    pub fun_fact: String,
    #[serde(default)]
    pub is_found: bool,
}

impl HuntItem {
    /// A fresh, unfound item with no image yet.
    pub fn new(id: u32, name: impl Into<String>, fun_fact: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            image_url: String::new(),
            fun_fact: fun_fact.into(),
            is_found: false,
        }
    }
}

/// Serialize an item list for storage. Order is preserved.
pub fn encode_items(items: &[HuntItem]) -> Result<String, MagpieError> {
    Ok(serde_json::to_string(items)?)
}

/// Inverse of [`encode_items`].
pub fn decode_items(json: &str) -> Result<Vec<HuntItem>, MagpieError> {
    Ok(serde_json::from_str(json)?)
}

/// An unvalidated `(name, funFact)` pair recovered from model output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationCandidate {
    pub name: String,
    pub fun_fact: String,
}

impl GenerationCandidate {
    pub fn new(name: impl Into<String>, fun_fact: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fun_fact: fun_fact.into(),
        }
    }

    /// The text the safety validator sees for this candidate.
    pub fn validation_text(&self) -> String {
        format!("{} - {}", self.name, self.fun_fact)
    }
}

// --- Requests ---

pub const MAX_LOCATION_CHARS: usize = 200;
pub const MAX_ITEM_COUNT: u32 = 36;

/// Caller input for a hunt, checked against the pipeline's preconditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HuntRequest {
    pub location: String,
    pub item_count: u32,
    pub difficulty: Difficulty,
}

impl HuntRequest {
    pub fn new(
        location: impl AsRef<str>,
        item_count: u32,
        difficulty: Difficulty,
    ) -> Result<Self, MagpieError> {
        let location = location.as_ref().trim();
        if location.is_empty() {
            return Err(MagpieError::InvalidRequest(
                "location must not be empty".to_string(),
            ));
        }
        if location.chars().count() > MAX_LOCATION_CHARS {
            return Err(MagpieError::InvalidRequest(format!(
                "location must be at most {MAX_LOCATION_CHARS} characters"
            )));
        }
        if item_count == 0 || item_count > MAX_ITEM_COUNT {
            return Err(MagpieError::InvalidRequest(format!(
                "item count must be between 1 and {MAX_ITEM_COUNT}, got {item_count}"
            )));
        }

        Ok(Self {
            location: location.to_string(),
            item_count,
            difficulty,
        })
    }

    pub fn for_grid(
        location: impl AsRef<str>,
        grid: GridSize,
        difficulty: Difficulty,
    ) -> Result<Self, MagpieError> {
        Self::new(location, grid.item_count(), difficulty)
    }
}

// --- Persisted hunts ---

/// A hunt ready to be inserted. The store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewHunt {
    pub location: String,
    pub difficulty: Difficulty,
    pub item_count: u32,
    pub items: Vec<HuntItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedHunt {
    pub id: HuntId,
    pub location: String,
    pub difficulty: Difficulty,
    pub item_count: u32,
    pub items: Vec<HuntItem>,
    pub is_complete: bool,
    pub created_at: DateTime<Utc>,
    pub last_played_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl GeneratedHunt {
    pub fn from_new(id: HuntId, hunt: NewHunt, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            location: hunt.location,
            difficulty: hunt.difficulty,
            item_count: hunt.item_count,
            items: hunt.items,
            is_complete: false,
            created_at,
            last_played_at: None,
            completed_at: None,
        }
    }

    /// Replace the item list with the player's current found-state.
    ///
    /// `completed_at` is stamped the first time every item is found and is
    /// kept even if an item is later un-found.
    pub fn apply_progress(&mut self, items: Vec<HuntItem>, now: DateTime<Utc>) {
        self.is_complete = !items.is_empty() && items.iter().all(|item| item.is_found);
        self.items = items;
        self.last_played_at = Some(now);
        if self.is_complete && self.completed_at.is_none() {
            self.completed_at = Some(now);
        }
    }

    /// This hunt's items with the found flags taken from `reported`.
    ///
    /// `reported` must list the same items as the hunt, in order, matched by id
    /// and name. Nothing but `is_found` is read from it.
    pub fn merge_found_state(&self, reported: &[HuntItem]) -> Result<Vec<HuntItem>, MagpieError> {
        if reported.len() != self.items.len() {
            return Err(MagpieError::InvalidRequest(format!(
                "hunt {} has {} items, progress lists {}",
                self.id,
                self.items.len(),
                reported.len()
            )));
        }

        self.items
            .iter()
            .zip(reported)
            .map(|(stored, incoming)| {
                if stored.id != incoming.id || stored.name != incoming.name {
                    return Err(MagpieError::InvalidRequest(format!(
                        "item {} ({}) does not match item {} of hunt {}",
                        incoming.id, incoming.name, stored.id, self.id
                    )));
                }
                Ok(HuntItem {
                    is_found: incoming.is_found,
                    ..stored.clone()
                })
            })
            .collect()
    }

    pub fn found_count(&self) -> usize {
        self.items.iter().filter(|item| item.is_found).count()
    }
}

// --- Audit log ---

/// One generation attempt, ready to be appended to the audit log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewContentLog {
    pub location: String,
    pub prompt: String,
    pub response: String,
    pub items_generated: u32,
    pub safety_check_passed: bool,
    pub flagged_content: Option<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AiContentLog {
    pub id: LogId,
    pub location: String,
    pub prompt: String,
    pub response: String,
    pub items_generated: u32,
    pub safety_check_passed: bool,
    pub flagged_content: Option<String>,
    pub user_reported: bool,
    pub report_reason: Option<String>,
    pub timestamp: DateTime<Utc>,
}

impl AiContentLog {
    pub fn from_new(id: LogId, log: NewContentLog) -> Self {
        Self {
            id,
            location: log.location,
            prompt: log.prompt,
            response: log.response,
            items_generated: log.items_generated,
            safety_check_passed: log.safety_check_passed,
            flagged_content: log.flagged_content,
            user_reported: false,
            report_reason: None,
            timestamp: log.timestamp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn hunt_with(items: Vec<HuntItem>) -> GeneratedHunt {
        let new = NewHunt {
            location: "Hyde Park".to_string(),
            difficulty: Difficulty::Explorer,
            item_count: items.len() as u32,
            items,
        };
        GeneratedHunt::from_new(1, new, Utc::now())
    }

    #[test]
    fn test_difficulty_round_trips_through_str() {
        for d in [Difficulty::Toddler, Difficulty::Explorer, Difficulty::Expert] {
            assert_eq!(d.as_str().parse::<Difficulty>().unwrap(), d);
        }
        assert_eq!("explorer".parse::<Difficulty>().unwrap(), Difficulty::Explorer);
        assert!("wizard".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_difficulty_serializes_upper_case() {
        assert_eq!(
            serde_json::to_string(&Difficulty::Toddler).unwrap(),
            "\"TODDLER\""
        );
    }

    #[test]
    fn test_grid_presets() {
        let counts: Vec<u32> = GridSize::PRESETS.iter().map(|g| g.item_count()).collect();
        assert_eq!(counts, vec![4, 9, 16, 25, 36]);
        assert_eq!(GridSize::default().item_count(), 9);
        assert_eq!(GridSize::DEFAULT.label(), "3×3");
        assert_eq!(GridSize::for_item_count(16), Some(GridSize { side: 4 }));
        assert_eq!(GridSize::for_item_count(10), None);
    }

    #[test]
    fn test_item_wire_format_is_camel_case() {
        let item = HuntItem::new(1, "Oak Tree", "Oaks can live 1000 years.");
        let value = serde_json::to_value(&item).unwrap();
        assert_eq!(
            value,
            serde_json::json!({
                "id": 1,
                "name": "Oak Tree",
                "imageUrl": "",
                "funFact": "Oaks can live 1000 years.",
                "isFound": false
            })
        );
    }

    #[test]
    fn test_encode_decode_preserves_order_and_state() {
        let mut items = vec![
            HuntItem::new(1, "Bandstand", "Built in 1869."),
            HuntItem::new(2, "Swan", "Swans mate for life."),
            HuntItem::new(3, "Serpentine \"lake\"", "Created in 1730."),
        ];
        items[1].is_found = true;
        items[2].image_url = "https://img.example/lake.png".to_string();

        let encoded = encode_items(&items).unwrap();
        assert_eq!(decode_items(&encoded).unwrap(), items);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(decode_items("not json").is_err());
    }

    #[test]
    fn test_request_trims_and_validates() {
        let req = HuntRequest::new("  Hyde Park ", 4, Difficulty::Explorer).unwrap();
        assert_eq!(req.location, "Hyde Park");

        assert!(HuntRequest::new("   ", 4, Difficulty::Explorer).is_err());
        assert!(HuntRequest::new("Hyde Park", 0, Difficulty::Explorer).is_err());
        assert!(HuntRequest::new("Hyde Park", 37, Difficulty::Explorer).is_err());
        assert!(HuntRequest::new("x".repeat(201), 4, Difficulty::Explorer).is_err());
    }

    #[test]
    fn test_request_for_grid() {
        let req = HuntRequest::for_grid("Kew", GridSize { side: 5 }, Difficulty::Expert).unwrap();
        assert_eq!(req.item_count, 25);
    }

    #[test]
    fn test_progress_marks_complete_once() {
        let mut hunt = hunt_with(vec![
            HuntItem::new(1, "Oak", "Old."),
            HuntItem::new(2, "Pond", "Wet."),
        ]);
        let t0 = Utc::now();

        let mut items = hunt.items.clone();
        items[0].is_found = true;
        hunt.apply_progress(items.clone(), t0);
        assert!(!hunt.is_complete);
        assert_eq!(hunt.completed_at, None);
        assert_eq!(hunt.last_played_at, Some(t0));

        items[1].is_found = true;
        let t1 = t0 + Duration::minutes(5);
        hunt.apply_progress(items.clone(), t1);
        assert!(hunt.is_complete);
        assert_eq!(hunt.completed_at, Some(t1));

        // Un-finding keeps the first completion time.
        items[1].is_found = false;
        let t2 = t1 + Duration::minutes(5);
        hunt.apply_progress(items.clone(), t2);
        assert!(!hunt.is_complete);
        assert_eq!(hunt.completed_at, Some(t1));

        items[1].is_found = true;
        hunt.apply_progress(items, t2 + Duration::minutes(1));
        assert!(hunt.is_complete);
        assert_eq!(hunt.completed_at, Some(t1));
        assert_eq!(hunt.found_count(), 2);
    }

    #[test]
    fn test_empty_progress_never_completes() {
        let mut hunt = hunt_with(vec![HuntItem::new(1, "Oak", "Old.")]);
        hunt.apply_progress(Vec::new(), Utc::now());
        assert!(!hunt.is_complete);
        assert_eq!(hunt.completed_at, None);
    }

    #[test]
    fn test_merge_found_state_takes_only_flags() {
        let hunt = hunt_with(vec![
            HuntItem::new(1, "Oak", "Old."),
            HuntItem::new(2, "Pond", "Wet."),
        ]);
        let mut reported = hunt.items.clone();
        reported[1].is_found = true;
        reported[1].fun_fact = "Rewritten.".to_string();
        reported[1].image_url = "https://img.example/pond.png".to_string();

        let merged = hunt.merge_found_state(&reported).unwrap();
        assert!(!merged[0].is_found);
        assert!(merged[1].is_found);
        assert_eq!(merged[1].fun_fact, "Wet.");
        assert_eq!(merged[1].image_url, "");
    }

    #[test]
    fn test_merge_found_state_rejects_other_items() {
        let hunt = hunt_with(vec![
            HuntItem::new(1, "Oak", "Old."),
            HuntItem::new(2, "Pond", "Wet."),
        ]);

        assert!(matches!(
            hunt.merge_found_state(&[]),
            Err(MagpieError::InvalidRequest(_))
        ));

        let mut extra = hunt.items.clone();
        extra.push(HuntItem::new(3, "Swan", "White."));
        assert!(hunt.merge_found_state(&extra).is_err());

        let mut renumbered = hunt.items.clone();
        renumbered[1].id = 7;
        assert!(hunt.merge_found_state(&renumbered).is_err());

        let mut renamed = hunt.items.clone();
        renamed[0].name = "Elm".to_string();
        assert!(hunt.merge_found_state(&renamed).is_err());

        let mut swapped = hunt.items.clone();
        swapped.reverse();
        assert!(hunt.merge_found_state(&swapped).is_err());
    }

    #[test]
    fn test_candidate_validation_text() {
        let c = GenerationCandidate::new("Oak Tree", "Oaks can live 1000 years.");
        assert_eq!(c.validation_text(), "Oak Tree - Oaks can live 1000 years.");
    }
}
