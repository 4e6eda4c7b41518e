//! End-to-end pipeline runs against the in-memory sinks.

use std::sync::Arc;

use magpie_common::{Difficulty, GridSize, HuntRequest, SafetyValidator, Severity};
use magpie_hunt::store::{InMemoryAuditLog, InMemoryHuntStore};
use magpie_hunt::testing::{safe_response, MockGenerator};
use magpie_hunt::{AuditLog, GenerationResult, HuntGenerator, HuntProgress, HuntStore, ResponseParser};

struct App {
    orchestrator: HuntGenerator,
    hunts: Arc<InMemoryHuntStore>,
    audit: Arc<InMemoryAuditLog>,
}

fn app(generator: MockGenerator, validator: SafetyValidator) -> App {
    let hunts = Arc::new(InMemoryHuntStore::new());
    let audit = Arc::new(InMemoryAuditLog::new());
    let orchestrator = HuntGenerator::new(
        Arc::new(generator),
        validator,
        ResponseParser::new(),
        hunts.clone(),
        audit.clone(),
    );
    App {
        orchestrator,
        hunts,
        audit,
    }
}

#[tokio::test]
async fn generated_hunt_can_be_played_to_completion() {
    let app = app(MockGenerator::replying(safe_response(4)), SafetyValidator::new());
    let request = HuntRequest::for_grid("Hyde Park", GridSize { side: 2 }, Difficulty::Toddler).unwrap();

    let GenerationResult::Success { hunt_id, items } = app.orchestrator.generate(&request).await else {
        panic!("expected success");
    };

    let progress = HuntProgress::new(app.hunts.clone());
    assert_eq!(progress.resume_latest().await.unwrap().unwrap().id, hunt_id);

    for item in &items {
        progress.mark_found(hunt_id, item.id).await.unwrap();
    }

    let hunt = app.hunts.get_by_id(hunt_id).await.unwrap().unwrap();
    assert!(hunt.is_complete);
    assert_eq!(hunt.found_count(), 4);
    assert!(progress.resume_latest().await.unwrap().is_none());
}

#[tokio::test]
async fn rejected_attempt_can_be_reported_for_review() {
    let reply = r#"[{"name": "Castle Gate", "funFact": "What the hell is a portcullis?"}]"#;
    let app = app(MockGenerator::replying(reply), SafetyValidator::new());

    let result = app
        .orchestrator
        .generate_hunt_for_location("Edinburgh", 1, Difficulty::Expert)
        .await;
    assert!(result.requires_review());
    assert!(app.hunts.is_empty());

    let entry = app.audit.by_location("Edinburgh").await.unwrap().remove(0);
    assert!(app.audit.mark_reported(entry.id, "rude word").await.unwrap());
    assert_eq!(app.audit.reported().await.unwrap().len(), 1);
}

#[tokio::test]
async fn relaxed_validator_lets_mild_words_through() {
    let reply = r#"[{"name": "Castle Gate", "funFact": "What the hell is a portcullis?"}]"#;
    let app = app(
        MockGenerator::replying(reply),
        SafetyValidator::with_minimum_severity(Severity::Severe),
    );

    let result = app
        .orchestrator
        .generate_hunt_for_location("Edinburgh", 1, Difficulty::Expert)
        .await;

    assert!(result.is_success());
    assert_eq!(app.hunts.len(), 1);
}

#[tokio::test]
async fn concurrent_calls_each_write_their_own_rows() {
    let app = app(MockGenerator::replying(safe_response(9)), SafetyValidator::new());

    let calls = (0..8).map(|i| {
        let orchestrator = app.orchestrator.clone();
        tokio::spawn(async move {
            orchestrator
                .generate_hunt_for_location(&format!("Park {i}"), 9, Difficulty::Explorer)
                .await
        })
    });

    let mut ids = Vec::new();
    for call in calls.collect::<Vec<_>>() {
        match call.await.unwrap() {
            GenerationResult::Success { hunt_id, .. } => ids.push(hunt_id),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    ids.sort_unstable();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(app.hunts.len(), 8);
    assert_eq!(app.audit.entries().len(), 8);
}
