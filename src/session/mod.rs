//! Discovery session state machine.
//!
//! [`SessionManager`] owns the session lifecycle: creation, resumption,
//! stage updates, validation-gated completion, research accumulation,
//! cancellation, and read-time expiry. It is a pure state mutator over the
//! injected [`StateStore`]; every failure is reported to the caller, never
//! retried.

use std::sync::Arc;

use chrono::{Duration, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::config::SessionConfig;
use crate::error::{AppResult, SessionError, ValidationError};
use crate::schema::{
    validate_project_name, validate_session, validate_stage_completion, validate_stage_data,
    ResearchQuery, Session, SessionMetadata, SessionStatus, Stage, StageStatus, StageValidation,
};
use crate::storage::{ProjectState, StateStore};

/// Result of completing a stage: the updated session plus the stage the
/// workflow advanced to, absent when the completed stage was the last.
#[derive(Debug, Clone)]
pub struct StageAdvance {
    /// The session after the transition.
    pub session: Session,
    /// The immediate successor now in progress, if any.
    pub next_stage: Option<Stage>,
}

/// Stage-gated session state machine over a storage backend.
pub struct SessionManager {
    store: Arc<dyn StateStore>,
    config: SessionConfig,
}

impl SessionManager {
    /// Create a manager over the given store.
    pub fn new(store: Arc<dyn StateStore>, config: SessionConfig) -> Self {
        Self { store, config }
    }

    /// Start a new session for a project.
    ///
    /// Fails with the session-exists error while a non-terminal, non-expired
    /// session is present. Overwrites the project's persisted session slot.
    pub async fn create_session(
        &self,
        project_name: &str,
        metadata: SessionMetadata,
    ) -> AppResult<Session> {
        validate_project_name(project_name)?;

        let mut state = self.store.load().await?;
        if let Some(existing) = &state.discovery_session {
            if !existing.status.is_terminal() && !self.is_expired(existing) {
                return Err(SessionError::AlreadyExists {
                    project_name: existing.project_name.clone(),
                }
                .into());
            }
        }

        let session = Session::new(project_name, metadata);
        validate_session(&session)?;

        state.discovery_session = Some(session.clone());
        self.store.save(&state).await?;

        info!(
            session_id = %session.id,
            project = %session.project_name,
            "Discovery session created"
        );
        Ok(session)
    }

    /// Resume a session by id, reactivating it and refreshing its clock.
    ///
    /// Fails with the session-not-found error for unknown ids and with the
    /// session-expired error once the session's age exceeds the configured
    /// timeout.
    pub async fn resume_session(&self, session_id: &str) -> AppResult<Session> {
        let mut state = self.store.load().await?;
        let session = self.session_mut(&mut state, session_id)?;

        session.status = SessionStatus::Active;
        session.last_updated = Utc::now();
        let resumed = session.clone();

        validate_session(&resumed)?;
        self.store.save(&state).await?;

        info!(session_id = %resumed.id, stage = %resumed.stage, "Session resumed");
        Ok(resumed)
    }

    /// The project's current session, if any. Pure read; absence is not an
    /// error.
    pub async fn get_current_session(&self) -> AppResult<Option<Session>> {
        let mut state = self.store.load().await?;
        if let Some(session) = state.discovery_session.as_mut() {
            session.normalize();
        }
        Ok(state.discovery_session)
    }

    /// Look up a session by id. Pure read; returns `None` when absent.
    pub async fn get_session(&self, session_id: &str) -> AppResult<Option<Session>> {
        Ok(self
            .get_current_session()
            .await?
            .filter(|s| s.id == session_id))
    }

    /// Merge partial data into one stage's payload.
    ///
    /// The merge is shallow: top-level fields in `partial_data` replace
    /// same-named fields, everything else is preserved. The merged payload
    /// is schema-validated before anything is persisted. The target stage
    /// becomes the session's current stage.
    pub async fn update_session_stage(
        &self,
        session_id: &str,
        stage: Stage,
        partial_data: Value,
    ) -> AppResult<Session> {
        let patch = as_object(&partial_data)?;

        let mut state = self.store.load().await?;
        let session = self.session_mut(&mut state, session_id)?;

        let progress = session.progress.entry(stage).or_default();
        let mut merged = progress.data.clone();
        shallow_merge(&mut merged, patch);
        validate_stage_data(stage, &merged)?;

        progress.data = merged;
        if progress.status == StageStatus::NotStarted {
            progress.status = StageStatus::InProgress;
            progress.started_at = Some(Utc::now());
        }

        session.stage = stage;
        session.last_updated = Utc::now();
        let updated = session.clone();

        validate_session(&updated)?;
        self.store.save(&state).await?;

        debug!(session_id = %updated.id, stage = %stage, "Stage data updated");
        Ok(updated)
    }

    /// Complete a stage and advance to its successor.
    ///
    /// This is the sole forward transition of `session.stage` and the sole
    /// place a session reaches `completed`. The final payload is merged and
    /// validated exactly like an update before the transition happens.
    pub async fn complete_stage(
        &self,
        session_id: &str,
        stage: Stage,
        final_data: Value,
        completion_score: Option<u8>,
    ) -> AppResult<StageAdvance> {
        let patch = as_object(&final_data)?;

        let mut state = self.store.load().await?;
        let session = self.session_mut(&mut state, session_id)?;

        let now = Utc::now();
        let progress = session.progress.entry(stage).or_default();
        let mut merged = progress.data.clone();
        shallow_merge(&mut merged, patch);
        validate_stage_data(stage, &merged)?;

        progress.data = merged;
        progress.status = StageStatus::Completed;
        progress.completed_at = Some(now);
        progress.started_at = progress.started_at.or(Some(now));
        progress.completion_score = completion_score.unwrap_or(100).min(100);

        let next_stage = stage.successor();
        match next_stage {
            Some(next) => {
                let next_progress = session.progress.entry(next).or_default();
                if next_progress.status == StageStatus::NotStarted {
                    next_progress.status = StageStatus::InProgress;
                    next_progress.started_at = Some(now);
                }
                session.stage = next;
            }
            None => {
                session.status = SessionStatus::Completed;
            }
        }

        session.last_updated = now;
        let updated = session.clone();

        validate_session(&updated)?;
        self.store.save(&state).await?;

        info!(
            session_id = %updated.id,
            completed = %stage,
            next = next_stage.map(|s| s.as_str()).unwrap_or("none"),
            "Stage completed"
        );
        Ok(StageAdvance {
            session: updated,
            next_stage,
        })
    }

    /// Cancel a session. Terminal; a new session may be created afterwards.
    pub async fn cancel_session(&self, session_id: &str) -> AppResult<Session> {
        let mut state = self.store.load().await?;
        let session = self.session_mut(&mut state, session_id)?;

        session.status = SessionStatus::Cancelled;
        session.last_updated = Utc::now();
        let cancelled = session.clone();

        validate_session(&cancelled)?;
        self.store.save(&state).await?;

        info!(session_id = %cancelled.id, "Session cancelled");
        Ok(cancelled)
    }

    /// Append a research record to a named bucket.
    ///
    /// An unknown bucket name is a soft-fail: the record is dropped with a
    /// warning and the session is returned unchanged.
    pub async fn add_research_data(
        &self,
        session_id: &str,
        bucket: &str,
        query: ResearchQuery,
    ) -> AppResult<Session> {
        let mut state = self.store.load().await?;
        let session = self.session_mut(&mut state, session_id)?;

        match session.research_data.bucket_mut(bucket) {
            Some(entries) => entries.push(query),
            None => {
                warn!(bucket = %bucket, "Unknown research bucket, record dropped");
                return Ok(session.clone());
            }
        }

        session.last_updated = Utc::now();
        let updated = session.clone();

        self.store.save(&state).await?;
        Ok(updated)
    }

    /// Score submitted stage data against the stage's requirement policy.
    ///
    /// Pure function, usable as a gate before [`Self::complete_stage`].
    pub fn validate_stage_completion(&self, stage: Stage, data: &Value) -> StageValidation {
        validate_stage_completion(stage, data)
    }

    /// Whether a session's age exceeds the configured timeout.
    pub fn is_expired(&self, session: &Session) -> bool {
        Utc::now() - session.created > Duration::hours(self.config.timeout_hours as i64)
    }

    /// Find the session by id in loaded state, enforcing existence and the
    /// read-time expiry check shared by every mutating operation.
    fn session_mut<'a>(
        &self,
        state: &'a mut ProjectState,
        session_id: &str,
    ) -> Result<&'a mut Session, SessionError> {
        let timeout_hours = self.config.timeout_hours;
        let expired = match &state.discovery_session {
            Some(s) if s.id == session_id => self.is_expired(s),
            _ => {
                return Err(SessionError::NotFound {
                    session_id: session_id.to_string(),
                })
            }
        };
        if expired {
            return Err(SessionError::Expired {
                session_id: session_id.to_string(),
                timeout_hours,
            });
        }
        let session = state
            .discovery_session
            .as_mut()
            .ok_or_else(|| SessionError::NotFound {
                session_id: session_id.to_string(),
            })?;
        session.normalize();
        Ok(session)
    }
}

/// Require a JSON object payload, naming the offending field otherwise.
fn as_object(value: &Value) -> Result<&serde_json::Map<String, Value>, ValidationError> {
    value
        .as_object()
        .ok_or_else(|| ValidationError::new("data", "stage data must be a JSON object"))
}

/// Shallow merge: top-level keys of `patch` replace keys of `target`.
fn shallow_merge(target: &mut Value, patch: &serde_json::Map<String, Value>) {
    if !target.is_object() {
        *target = Value::Object(serde_json::Map::new());
    }
    if let Some(object) = target.as_object_mut() {
        for (key, value) in patch {
            object.insert(key.clone(), value.clone());
        }
    }
}
