//! Integration tests for the file-backed state store.

use serde_json::json;
use tempfile::TempDir;

use mcp_discovery_workflow::schema::{Session, SessionMetadata};
use mcp_discovery_workflow::storage::{JsonFileStore, ProjectState, StateStore};

fn store_in(dir: &TempDir) -> JsonFileStore {
    JsonFileStore::new(dir.path().join("discovery-state.json"))
}

#[tokio::test]
async fn test_missing_file_loads_default_state() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let state = store.load().await.unwrap();
    assert!(state.discovery_session.is_none());
    assert_eq!(state.version, 0);
}

#[tokio::test]
async fn test_save_then_load_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let mut state = store.load().await.unwrap();
    state.discovery_session = Some(Session::new("Persisted", SessionMetadata::default()));
    store.save(&state).await.unwrap();

    let reloaded = store.load().await.unwrap();
    let session = reloaded.discovery_session.unwrap();
    assert_eq!(session.project_name, "Persisted");
    assert_eq!(reloaded.version, 1);
}

#[tokio::test]
async fn test_corrupt_file_degrades_to_default() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("discovery-state.json");
    tokio::fs::write(&path, b"{ not valid json !!!").await.unwrap();

    let store = JsonFileStore::new(&path);
    let state = store.load().await.unwrap();
    assert!(state.discovery_session.is_none());
}

#[tokio::test]
async fn test_corrupt_file_can_be_overwritten() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("discovery-state.json");
    tokio::fs::write(&path, b"garbage").await.unwrap();

    let store = JsonFileStore::new(&path);
    let mut state = store.load().await.unwrap();
    state.discovery_session = Some(Session::new("Recovered", SessionMetadata::default()));
    store.save(&state).await.unwrap();

    let reloaded = store.load().await.unwrap();
    assert_eq!(
        reloaded.discovery_session.unwrap().project_name,
        "Recovered"
    );
}

#[tokio::test]
async fn test_sibling_state_is_preserved() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("discovery-state.json");
    tokio::fs::write(
        &path,
        serde_json::to_vec(&json!({
            "version": 0,
            "tasks": { "next_id": 12, "items": ["a", "b"] },
        }))
        .unwrap(),
    )
    .await
    .unwrap();

    let store = JsonFileStore::new(&path);
    let mut state = store.load().await.unwrap();
    assert_eq!(state.extra["tasks"]["next_id"], 12);

    state.discovery_session = Some(Session::new("Coexists", SessionMetadata::default()));
    store.save(&state).await.unwrap();

    let raw = tokio::fs::read_to_string(&path).await.unwrap();
    let document: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(document["tasks"]["next_id"], 12);
    assert_eq!(document["discovery_session"]["project_name"], "Coexists");
}

#[tokio::test]
async fn test_version_conflict_on_stale_save() {
    let dir = TempDir::new().unwrap();
    let store = store_in(&dir);

    let stale = store.load().await.unwrap();
    store.save(&stale).await.unwrap();

    let err = store.save(&stale).await.unwrap_err();
    assert!(err.to_string().contains("Version conflict"));
}

#[tokio::test]
async fn test_create_parent_directories_on_save() {
    let dir = TempDir::new().unwrap();
    let store = JsonFileStore::new(dir.path().join("nested/deep/state.json"));

    let state = ProjectState::default();
    store.save(&state).await.unwrap();

    assert!(dir.path().join("nested/deep/state.json").exists());
}

#[tokio::test]
async fn test_missing_progress_entries_are_normalized_on_load() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("discovery-state.json");

    let mut session = Session::new("Sparse", SessionMetadata::default());
    session
        .progress
        .remove(&mcp_discovery_workflow::schema::Stage::PrdGeneration);
    let mut document = serde_json::to_value(ProjectState::default()).unwrap();
    document["discovery_session"] = serde_json::to_value(&session).unwrap();
    tokio::fs::write(&path, serde_json::to_vec(&document).unwrap())
        .await
        .unwrap();

    let store = JsonFileStore::new(&path);
    let state = store.load().await.unwrap();
    let loaded = state.discovery_session.unwrap();
    assert_eq!(loaded.progress.len(), 5);
}
