//! File-backed state store: one JSON document per project.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::{debug, warn};

use super::{ProjectState, StateStore};
use crate::error::{StorageError, StorageResult};

/// State store persisting the document as a single JSON file.
///
/// Writes go to a sibling temp file first and are moved into place, so a
/// reader never observes a torn document.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Create a store for the given state file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// The state file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and parse the document, degrading to the default on any problem.
    async fn read_state(&self) -> StorageResult<ProjectState> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "No state file yet, using default state");
                return Ok(ProjectState::default());
            }
            Err(e) => {
                return Err(StorageError::Io {
                    message: format!("failed to read {}: {}", self.path.display(), e),
                })
            }
        };

        match serde_json::from_str::<ProjectState>(&raw) {
            Ok(state) => Ok(state),
            Err(e) => {
                warn!(
                    path = %self.path.display(),
                    error = %e,
                    "State file is unparsable, falling back to default state"
                );
                Ok(ProjectState::default())
            }
        }
    }
}

#[async_trait]
impl StateStore for JsonFileStore {
    async fn load(&self) -> StorageResult<ProjectState> {
        let mut state = self.read_state().await?;
        if let Some(session) = state.discovery_session.as_mut() {
            session.normalize();
        }
        Ok(state)
    }

    async fn save(&self, state: &ProjectState) -> StorageResult<()> {
        let current = self.read_state().await?;
        if current.version != state.version {
            return Err(StorageError::VersionConflict {
                expected: state.version,
                actual: current.version,
            });
        }

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::Io {
                    message: format!("failed to create state directory: {}", e),
                })?;
        }

        let mut next = state.clone();
        next.version = state.version + 1;
        let body = serde_json::to_string_pretty(&next)?;

        // Whole-document replace: write aside, then move into place.
        let tmp_path = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp_path, body.as_bytes())
            .await
            .map_err(|e| StorageError::Io {
                message: format!("failed to write {}: {}", tmp_path.display(), e),
            })?;
        tokio::fs::rename(&tmp_path, &self.path)
            .await
            .map_err(|e| StorageError::Io {
                message: format!("failed to replace {}: {}", self.path.display(), e),
            })?;

        debug!(path = %self.path.display(), version = next.version, "State saved");
        Ok(())
    }
}
