//! Persisted-state storage for discovery sessions.
//!
//! One JSON document per project holds the discovery session next to any
//! sibling workflow state. Readers tolerate a missing or unparsable document
//! by falling back to the empty default; writers replace the whole document
//! and reject concurrent modification through an optimistic version check.

mod json_file;
mod memory;

pub use json_file::JsonFileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::StorageResult;
use crate::schema::Session;

/// The whole persisted state document for one project.
///
/// Sibling workflow state owned by other tools is carried through untouched
/// in `extra`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProjectState {
    /// The discovery session, if one has been started.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub discovery_session: Option<Session>,
    /// Optimistic-concurrency counter, bumped on every save.
    #[serde(default)]
    pub version: u64,
    /// Sibling state this tool does not own.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Storage backend for the per-project state document.
///
/// Implementations must guarantee that a completed `save` is visible to any
/// subsequent `load` (whole-document replace, no partial patching), and must
/// reject a save whose `version` does not match the persisted document.
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Load the state document.
    ///
    /// A missing or corrupt document yields the empty default, never an
    /// error: corrupt storage is recovered locally, not surfaced.
    async fn load(&self) -> StorageResult<ProjectState>;

    /// Replace the state document.
    ///
    /// Fails with a version-conflict error when the persisted version no
    /// longer matches `state.version`; on success the persisted version is
    /// `state.version + 1`.
    async fn save(&self, state: &ProjectState) -> StorageResult<()>;
}
