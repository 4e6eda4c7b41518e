//! Integration tests for the Postgres sinks.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use chrono::Utc;
use sqlx::PgPool;

use magpie_common::{Difficulty, NewContentLog, NewHunt};
use magpie_hunt::store::{migrate, PgAuditLog, PgHuntStore};
use magpie_hunt::testing::sample_items;
use magpie_hunt::{AuditLog, HuntProgress, HuntStore};

/// Get a test database pool, or skip if no test DB is available.
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    migrate(&pool).await.ok()?;

    // Clean slate for each test
    sqlx::query("TRUNCATE generated_hunts, ai_content_logs RESTART IDENTITY")
        .execute(&pool)
        .await
        .ok()?;

    Some(pool)
}

fn new_hunt(location: &str, n: u32) -> NewHunt {
    NewHunt {
        location: location.to_string(),
        difficulty: Difficulty::Expert,
        item_count: n,
        items: sample_items(n),
    }
}

fn log(location: &str, passed: bool) -> NewContentLog {
    NewContentLog {
        location: location.to_string(),
        prompt: "prompt".to_string(),
        response: "[]".to_string(),
        items_generated: 3,
        safety_check_passed: passed,
        flagged_content: (!passed).then(|| "Content contains flagged terms: weapon".to_string()),
        timestamp: Utc::now(),
    }
}

// =========================================================================
// Hunts
// =========================================================================

#[tokio::test]
async fn insert_then_get_round_trips_items() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgHuntStore::new(pool);

    let id = store.insert(new_hunt("Hyde Park", 4)).await.unwrap();
    let hunt = store.get_by_id(id).await.unwrap().unwrap();

    assert_eq!(hunt.location, "Hyde Park");
    assert_eq!(hunt.difficulty, Difficulty::Expert);
    assert_eq!(hunt.item_count, 4);
    assert_eq!(hunt.items, sample_items(4));
    assert!(!hunt.is_complete);
    assert_eq!(hunt.last_played_at, None);
    assert_eq!(hunt.completed_at, None);
}

#[tokio::test]
async fn missing_hunt_is_none() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgHuntStore::new(pool);

    assert!(store.get_by_id(12345).await.unwrap().is_none());
}

#[tokio::test]
async fn progress_persists_completion() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = std::sync::Arc::new(PgHuntStore::new(pool));
    let progress = HuntProgress::new(store.clone());

    let id = store.insert(new_hunt("Kew Gardens", 2)).await.unwrap();
    progress.mark_found(id, 1).await.unwrap();
    progress.mark_found(id, 2).await.unwrap();

    let hunt = store.get_by_id(id).await.unwrap().unwrap();
    assert!(hunt.is_complete);
    assert!(hunt.completed_at.is_some());
    assert!(hunt.items.iter().all(|i| i.is_found));
    assert!(store.latest_incomplete().await.unwrap().is_none());
}

#[tokio::test]
async fn list_and_delete() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = PgHuntStore::new(pool);

    let a = store.insert(new_hunt("Kew Gardens", 1)).await.unwrap();
    let b = store.insert(new_hunt("Hyde Park", 1)).await.unwrap();

    let ids: Vec<i64> = store
        .list()
        .await
        .unwrap()
        .iter()
        .map(|h| h.id)
        .filter(|id| *id == a || *id == b)
        .collect();
    assert_eq!(ids, vec![b, a]);

    store.delete(a).await.unwrap();
    assert!(store.get_by_id(a).await.unwrap().is_none());
}

// =========================================================================
// Audit log
// =========================================================================

#[tokio::test]
async fn audit_entries_can_be_reported() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let audit = PgAuditLog::new(pool);

    let first = audit.append(log("Hyde Park", false)).await.unwrap();
    let _second = audit.append(log("Kew Gardens", true)).await.unwrap();

    assert!(audit.reported().await.unwrap().is_empty());
    assert!(audit.mark_reported(first, "not for kids").await.unwrap());
    assert!(!audit.mark_reported(999, "missing").await.unwrap());

    let reported = audit.reported().await.unwrap();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].id, first);
    assert!(reported[0].user_reported);
    assert_eq!(reported[0].report_reason.as_deref(), Some("not for kids"));
    assert!(reported[0].flagged_content.is_some());

    let kew = audit.by_location("Kew Gardens").await.unwrap();
    assert_eq!(kew.len(), 1);
    assert!(kew[0].safety_check_passed);
    assert_eq!(kew[0].items_generated, 3);
}
