//! Integration tests for the session state machine.
//!
//! Exercises the full lifecycle against the in-memory store: creation,
//! exclusivity, stage advancement, research accumulation, and expiry.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::json;

use mcp_discovery_workflow::config::SessionConfig;
use mcp_discovery_workflow::schema::{
    QueryType, ResearchQuery, SessionMetadata, SessionStatus, Stage, StageStatus,
};
use mcp_discovery_workflow::session::SessionManager;
use mcp_discovery_workflow::storage::{MemoryStore, StateStore};

fn manager() -> (SessionManager, Arc<MemoryStore>) {
    let store = Arc::new(MemoryStore::new());
    (
        SessionManager::new(store.clone(), SessionConfig::default()),
        store,
    )
}

#[tokio::test]
async fn test_fresh_session_has_canonical_progress_shape() {
    let (manager, _) = manager();
    let session = manager
        .create_session("Fresh", SessionMetadata::default())
        .await
        .unwrap();

    for stage in Stage::ALL {
        let expected = if stage == Stage::ProblemFraming {
            StageStatus::InProgress
        } else {
            StageStatus::NotStarted
        };
        assert_eq!(session.stage_progress(stage).unwrap().status, expected);
    }
}

#[tokio::test]
async fn test_second_create_fails_until_first_is_terminal() {
    let (manager, _) = manager();
    let first = manager
        .create_session("Exclusive", SessionMetadata::default())
        .await
        .unwrap();

    let err = manager
        .create_session("Exclusive", SessionMetadata::default())
        .await
        .unwrap_err();
    assert_eq!(err.code(), "session-exists");

    manager.cancel_session(&first.id).await.unwrap();

    let second = manager
        .create_session("Exclusive", SessionMetadata::default())
        .await
        .unwrap();
    assert_eq!(second.status, SessionStatus::Active);
}

#[tokio::test]
async fn test_completion_after_full_workflow_allows_new_session() {
    let (manager, _) = manager();
    let session = manager
        .create_session("Finished", SessionMetadata::default())
        .await
        .unwrap();

    for stage in Stage::ALL {
        manager
            .complete_stage(&session.id, stage, json!({}), None)
            .await
            .unwrap();
    }

    let done = manager.get_session(&session.id).await.unwrap().unwrap();
    assert_eq!(done.status, SessionStatus::Completed);

    // A completed session no longer blocks creation.
    manager
        .create_session("Finished", SessionMetadata::default())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_complete_stage_never_skips() {
    let (manager, _) = manager();
    let session = manager
        .create_session("Ordered", SessionMetadata::default())
        .await
        .unwrap();

    let mut stage = Stage::ProblemFraming;
    loop {
        let advance = manager
            .complete_stage(&session.id, stage, json!({}), None)
            .await
            .unwrap();
        assert_eq!(advance.next_stage, stage.successor());
        match advance.next_stage {
            Some(next) => stage = next,
            None => break,
        }
    }
    assert_eq!(stage, Stage::PrdGeneration);
}

#[tokio::test]
async fn test_resume_missing_session_reports_not_found() {
    let (manager, _) = manager();
    // Never a silent null: resumption of an unknown id is an error.
    let err = manager.resume_session("no-such-session").await.unwrap_err();
    assert_eq!(err.code(), "session-not-found");
}

#[tokio::test]
async fn test_resume_refreshes_clock_and_reactivates() {
    let (manager, store) = manager();
    let session = manager
        .create_session("Resumable", SessionMetadata::default())
        .await
        .unwrap();

    // Pause it out-of-band.
    let mut state = store.load().await.unwrap();
    if let Some(s) = state.discovery_session.as_mut() {
        s.status = SessionStatus::Paused;
        s.last_updated = Utc::now() - Duration::hours(5);
    }
    store.save(&state).await.unwrap();

    let resumed = manager.resume_session(&session.id).await.unwrap();
    assert_eq!(resumed.status, SessionStatus::Active);
    assert!(Utc::now() - resumed.last_updated < Duration::minutes(1));
}

#[tokio::test]
async fn test_expired_session_fails_every_operation() {
    let (manager, store) = manager();
    let session = manager
        .create_session("Stale", SessionMetadata::default())
        .await
        .unwrap();

    let mut state = store.load().await.unwrap();
    if let Some(s) = state.discovery_session.as_mut() {
        s.created = Utc::now() - Duration::hours(200);
    }
    store.save(&state).await.unwrap();

    let resume = manager.resume_session(&session.id).await.unwrap_err();
    assert_eq!(resume.code(), "session-expired");

    let update = manager
        .update_session_stage(&session.id, Stage::ProblemFraming, json!({}))
        .await
        .unwrap_err();
    assert_eq!(update.code(), "session-expired");

    let complete = manager
        .complete_stage(&session.id, Stage::ProblemFraming, json!({}), None)
        .await
        .unwrap_err();
    assert_eq!(complete.code(), "session-expired");

    let research = manager
        .add_research_data(
            &session.id,
            "general",
            ResearchQuery::new("search", QueryType::General, "q"),
        )
        .await
        .unwrap_err();
    assert_eq!(research.code(), "session-expired");
}

#[tokio::test]
async fn test_ecommerce_end_to_end_scenario() {
    let (manager, _) = manager();
    let session = manager
        .create_session("E-commerce Platform", SessionMetadata::default())
        .await
        .unwrap();

    // One market-analysis research record.
    let record = ResearchQuery::new(
        "search",
        QueryType::MarketAnalysis,
        "online retail market size",
    )
    .with_results(json!({ "estimate": "$5.7T global" }));
    manager
        .add_research_data(&session.id, "market_analysis", record)
        .await
        .unwrap();

    manager
        .complete_stage(&session.id, Stage::ProblemFraming, json!({}), None)
        .await
        .unwrap();

    manager
        .complete_stage(
            &session.id,
            Stage::MarketResearch,
            json!({
                "competitors": [{ "name": "Shopify" }, { "name": "WooCommerce" }],
                "market_size": "$5.7T global e-commerce",
                "opportunities": ["niche B2B storefronts"],
                "target_personas": [{ "name": "Boutique owner" }],
            }),
            Some(85),
        )
        .await
        .unwrap();

    manager
        .complete_stage(
            &session.id,
            Stage::TechnicalFeasibility,
            json!({
                "recommended_stack": [
                    { "layer": "backend", "technology": "Rust" },
                    { "layer": "frontend", "technology": "React" },
                ],
                "architecture_overview": "API-first storefront with managed checkout",
                "complexity_ratings": [{ "layer": "backend", "rating": "medium" }],
                "risks": [{ "description": "payment integration scope" }],
            }),
            Some(90),
        )
        .await
        .unwrap();

    let functional: Vec<serde_json::Value> = (1..=5)
        .map(|i| {
            json!({
                "id": format!("FR-{}", i),
                "title": format!("Feature {}", i),
                "description": format!("Implements feature {}", i),
            })
        })
        .collect();
    let non_functional: Vec<serde_json::Value> = (1..=3)
        .map(|i| {
            json!({
                "id": format!("NFR-{}", i),
                "title": format!("Quality {}", i),
                "description": format!("Quality attribute {}", i),
                "type": "performance",
            })
        })
        .collect();

    let advance = manager
        .complete_stage(
            &session.id,
            Stage::RequirementsSynthesis,
            json!({
                "functional_requirements": functional,
                "non_functional_requirements": non_functional,
                "user_stories": [{ "id": "US-1", "story": "As a buyer I can check out" }],
            }),
            Some(100),
        )
        .await
        .unwrap();

    let result = advance.session;
    assert_eq!(result.status, SessionStatus::Active);
    assert_eq!(result.stage, Stage::PrdGeneration);
    assert_eq!(
        result
            .stage_progress(Stage::RequirementsSynthesis)
            .unwrap()
            .status,
        StageStatus::Completed
    );
    assert_eq!(result.research_data.market_analysis.len(), 1);
}

#[tokio::test]
async fn test_validate_stage_completion_gates_advancement() {
    let (manager, _) = manager();

    let incomplete = json!({ "competitors": [{ "name": "Acme" }] });
    let validation = manager.validate_stage_completion(Stage::MarketResearch, &incomplete);
    assert!(!validation.valid);
    assert_eq!(validation.completed_fields, 1);
    assert_eq!(validation.total_fields, 4);

    let complete = json!({
        "competitors": [{ "name": "Acme" }],
        "market_size": "$1B",
        "opportunities": ["gap in mid-market"],
        "target_personas": [{ "name": "Analyst" }],
    });
    let validation = manager.validate_stage_completion(Stage::MarketResearch, &complete);
    assert!(validation.valid);
    assert_eq!(validation.score, 100);
}

#[tokio::test]
async fn test_version_conflict_prevents_lost_updates() {
    let (manager, store) = manager();
    let session = manager
        .create_session("Concurrent", SessionMetadata::default())
        .await
        .unwrap();

    // Two readers take the same snapshot; the slower writer must fail.
    let snapshot_a = store.load().await.unwrap();
    let snapshot_b = store.load().await.unwrap();

    store.save(&snapshot_a).await.unwrap();
    let err = store.save(&snapshot_b).await.unwrap_err();
    assert!(err.to_string().contains("Version conflict"));

    // The manager still operates on the latest state.
    manager
        .update_session_stage(&session.id, Stage::ProblemFraming, json!({}))
        .await
        .unwrap();
}
