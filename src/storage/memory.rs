//! In-memory state store for tests and ephemeral runs.

use std::sync::Mutex;

use async_trait::async_trait;

use super::{ProjectState, StateStore};
use crate::error::{StorageError, StorageResult};

/// State store holding the document in process memory.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<ProjectState>,
}

impl MemoryStore {
    /// Create an empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StateStore for MemoryStore {
    async fn load(&self) -> StorageResult<ProjectState> {
        let state = self.state.lock().map_err(|e| StorageError::Io {
            message: format!("state lock poisoned: {}", e),
        })?;
        Ok(state.clone())
    }

    async fn save(&self, state: &ProjectState) -> StorageResult<()> {
        let mut current = self.state.lock().map_err(|e| StorageError::Io {
            message: format!("state lock poisoned: {}", e),
        })?;

        if current.version != state.version {
            return Err(StorageError::VersionConflict {
                expected: state.version,
                actual: current.version,
            });
        }

        let mut next = state.clone();
        next.version = state.version + 1;
        *current = next;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_load_empty_default() {
        let store = MemoryStore::new();
        let state = store.load().await.unwrap();
        assert!(state.discovery_session.is_none());
        assert_eq!(state.version, 0);
    }

    #[tokio::test]
    async fn test_save_bumps_version() {
        let store = MemoryStore::new();
        let state = store.load().await.unwrap();
        store.save(&state).await.unwrap();

        let reloaded = store.load().await.unwrap();
        assert_eq!(reloaded.version, 1);
    }

    #[tokio::test]
    async fn test_stale_save_is_rejected() {
        let store = MemoryStore::new();
        let stale = store.load().await.unwrap();

        // A concurrent writer lands first.
        store.save(&stale).await.unwrap();

        let err = store.save(&stale).await.unwrap_err();
        assert!(matches!(err, StorageError::VersionConflict { .. }));
    }
}
