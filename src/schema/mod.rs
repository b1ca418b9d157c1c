//! Session and stage schema definitions.
//!
//! This module defines the shape of a discovery session, the canonical stage
//! set and its transition table, research records, and the per-stage payload
//! schemas with their validation rules. Everything else in the crate depends
//! on these types; they depend on nothing but serde.

mod payloads;
mod validate;


pub use payloads::*;
pub use validate::*;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::SessionError;

/// Canonical discovery stages, in workflow order.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Stage {
    /// Problem framing: statement, audience, success criteria.
    ProblemFraming,
    /// Market research: competitors, market size, personas.
    MarketResearch,
    /// Technical feasibility: stack, architecture, complexity, risks.
    TechnicalFeasibility,
    /// Requirements synthesis: functional/non-functional requirements, stories.
    RequirementsSynthesis,
    /// PRD generation: the final document.
    PrdGeneration,
}

impl Stage {
    /// All stages in canonical order.
    pub const ALL: [Stage; 5] = [
        Stage::ProblemFraming,
        Stage::MarketResearch,
        Stage::TechnicalFeasibility,
        Stage::RequirementsSynthesis,
        Stage::PrdGeneration,
    ];

    /// The first stage of every session.
    pub fn first() -> Stage {
        Stage::ProblemFraming
    }

    /// Explicit successor table; `None` marks the final stage.
    pub fn successor(&self) -> Option<Stage> {
        match self {
            Stage::ProblemFraming => Some(Stage::MarketResearch),
            Stage::MarketResearch => Some(Stage::TechnicalFeasibility),
            Stage::TechnicalFeasibility => Some(Stage::RequirementsSynthesis),
            Stage::RequirementsSynthesis => Some(Stage::PrdGeneration),
            Stage::PrdGeneration => None,
        }
    }

    /// Get the stage name as a wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::ProblemFraming => "problem-framing",
            Stage::MarketResearch => "market-research",
            Stage::TechnicalFeasibility => "technical-feasibility",
            Stage::RequirementsSynthesis => "requirements-synthesis",
            Stage::PrdGeneration => "prd-generation",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Stage {
    type Err = SessionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "problem-framing" => Ok(Stage::ProblemFraming),
            "market-research" => Ok(Stage::MarketResearch),
            "technical-feasibility" => Ok(Stage::TechnicalFeasibility),
            "requirements-synthesis" => Ok(Stage::RequirementsSynthesis),
            "prd-generation" => Ok(Stage::PrdGeneration),
            _ => Err(SessionError::InvalidStage {
                stage: s.to_string(),
            }),
        }
    }
}

/// Session lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// Session is in progress.
    #[default]
    Active,
    /// Session has been put aside without cancelling.
    Paused,
    /// All stages finished. Terminal.
    Completed,
    /// Explicitly cancelled. Terminal.
    Cancelled,
}

impl SessionStatus {
    /// Whether the status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Completed | SessionStatus::Cancelled)
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Paused => write!(f, "paused"),
            SessionStatus::Completed => write!(f, "completed"),
            SessionStatus::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Per-stage progress status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StageStatus {
    /// Stage has not been entered yet.
    #[default]
    NotStarted,
    /// Stage is currently accumulating data.
    InProgress,
    /// Stage finished with a completion score.
    Completed,
    /// Stage was deliberately skipped.
    Skipped,
}

impl std::fmt::Display for StageStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageStatus::NotStarted => write!(f, "not-started"),
            StageStatus::InProgress => write!(f, "in-progress"),
            StageStatus::Completed => write!(f, "completed"),
            StageStatus::Skipped => write!(f, "skipped"),
        }
    }
}

/// Progress record for one stage of one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageProgress {
    /// Current status of the stage.
    pub status: StageStatus,
    /// Completion score 0-100; meaningful once the stage has been entered.
    pub completion_score: u8,
    /// When the stage was first entered.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    /// Set if and only if `status == Completed`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Stage-specific payload, shallow-merged on update.
    #[serde(default = "empty_object")]
    pub data: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl Default for StageProgress {
    fn default() -> Self {
        Self {
            status: StageStatus::NotStarted,
            completion_score: 0,
            started_at: None,
            completed_at: None,
            data: empty_object(),
        }
    }
}

/// Research query type tag, matching the four session buckets.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QueryType {
    /// Market sizing and opportunity queries.
    MarketAnalysis,
    /// Technology and feasibility queries.
    TechnicalValidation,
    /// Competitor landscape queries.
    CompetitiveAnalysis,
    /// Anything else.
    #[default]
    General,
}

impl QueryType {
    /// The session research bucket this query type lands in.
    pub fn bucket(&self) -> &'static str {
        match self {
            QueryType::MarketAnalysis => "market_analysis",
            QueryType::TechnicalValidation => "technical_validation",
            QueryType::CompetitiveAnalysis => "competitive_analysis",
            QueryType::General => "general",
        }
    }
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            QueryType::MarketAnalysis => write!(f, "market-analysis"),
            QueryType::TechnicalValidation => write!(f, "technical-validation"),
            QueryType::CompetitiveAnalysis => write!(f, "competitive-analysis"),
            QueryType::General => write!(f, "general"),
        }
    }
}

impl std::str::FromStr for QueryType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "market-analysis" | "market_analysis" => Ok(QueryType::MarketAnalysis),
            "technical-validation" | "technical_validation" => Ok(QueryType::TechnicalValidation),
            "competitive-analysis" | "competitive_analysis" => Ok(QueryType::CompetitiveAnalysis),
            "general" => Ok(QueryType::General),
            _ => Err(format!("Unknown query type: {}", s)),
        }
    }
}

/// Immutable record of one research action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchQuery {
    /// The query text as sent to the provider.
    pub query: String,
    /// Provider identifier.
    pub provider: String,
    /// Query type tag.
    pub query_type: QueryType,
    /// When the query was executed.
    pub timestamp: DateTime<Utc>,
    /// Whether the provider call succeeded.
    pub success: bool,
    /// Result payload, if any.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub results: Option<serde_json::Value>,
    /// Error message for failed queries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResearchQuery {
    /// Create a new research record; timestamped now, presumed successful.
    pub fn new(
        provider: impl Into<String>,
        query_type: QueryType,
        query: impl Into<String>,
    ) -> Self {
        Self {
            query: query.into(),
            provider: provider.into(),
            query_type,
            timestamp: Utc::now(),
            success: true,
            results: None,
            error: None,
        }
    }

    /// Attach a successful result payload
    pub fn with_results(mut self, results: serde_json::Value) -> Self {
        self.success = true;
        self.results = Some(results);
        self
    }

    /// Mark as failed with an error message
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }
}

/// The four named research buckets of a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ResearchData {
    /// Market sizing and opportunity results.
    #[serde(default)]
    pub market_analysis: Vec<ResearchQuery>,
    /// Technology validation results.
    #[serde(default)]
    pub technical_validation: Vec<ResearchQuery>,
    /// Competitor landscape results.
    #[serde(default)]
    pub competitive_analysis: Vec<ResearchQuery>,
    /// Everything else.
    #[serde(default)]
    pub general: Vec<ResearchQuery>,
}

impl ResearchData {
    /// Resolve a bucket by name; `None` for unknown buckets (the caller
    /// decides whether that is a soft-fail).
    pub fn bucket_mut(&mut self, name: &str) -> Option<&mut Vec<ResearchQuery>> {
        match name {
            "market_analysis" | "market-analysis" => Some(&mut self.market_analysis),
            "technical_validation" | "technical-validation" => Some(&mut self.technical_validation),
            "competitive_analysis" | "competitive-analysis" => {
                Some(&mut self.competitive_analysis)
            }
            "general" => Some(&mut self.general),
            _ => None,
        }
    }

    /// Total number of recorded queries across all buckets.
    pub fn total_queries(&self) -> usize {
        self.market_analysis.len()
            + self.technical_validation.len()
            + self.competitive_analysis.len()
            + self.general.len()
    }
}

/// Free-form user preferences and constraints attached to a session.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMetadata {
    /// Caller-supplied preferences, passed through untouched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_preferences: Option<serde_json::Value>,
    /// Technology hints provided up front.
    #[serde(default)]
    pub tech_stack_hints: Vec<String>,
    /// Known constraints provided up front.
    #[serde(default)]
    pub constraints: Vec<String>,
}

/// One discovery session for one project.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Unique session identifier.
    pub id: String,
    /// Project this session belongs to.
    pub project_name: String,
    /// Current stage; always one of the canonical five.
    pub stage: Stage,
    /// Session lifecycle status.
    pub status: SessionStatus,
    /// Progress for every canonical stage, created at session creation.
    pub progress: BTreeMap<Stage, StageProgress>,
    /// When the session was created.
    pub created: DateTime<Utc>,
    /// When the session was last mutated.
    pub last_updated: DateTime<Utc>,
    /// Accumulated research results.
    #[serde(default)]
    pub research_data: ResearchData,
    /// User preferences and constraints.
    #[serde(default)]
    pub metadata: SessionMetadata,
}

impl Session {
    /// Create a new session for a project.
    ///
    /// All five stages get a progress entry: the first stage starts
    /// in-progress with a start timestamp, the rest not-started.
    pub fn new(project_name: impl Into<String>, metadata: SessionMetadata) -> Self {
        let now = Utc::now();
        let mut progress = BTreeMap::new();
        for stage in Stage::ALL {
            progress.insert(stage, StageProgress::default());
        }
        if let Some(first) = progress.get_mut(&Stage::first()) {
            first.status = StageStatus::InProgress;
            first.started_at = Some(now);
        }

        Self {
            id: Uuid::new_v4().to_string(),
            project_name: project_name.into(),
            stage: Stage::first(),
            status: SessionStatus::Active,
            progress,
            created: now,
            last_updated: now,
            research_data: ResearchData::default(),
            metadata,
        }
    }

    /// Read access to one stage's progress.
    pub fn stage_progress(&self, stage: Stage) -> Option<&StageProgress> {
        self.progress.get(&stage)
    }

    /// Whether the requirements-synthesis stage has been completed.
    ///
    /// Document assembly checks this precondition through the public shape.
    pub fn requirements_completed(&self) -> bool {
        self.stage_progress(Stage::RequirementsSynthesis)
            .map(|p| p.status == StageStatus::Completed)
            .unwrap_or(false)
    }

    /// Restore the all-stages invariant on sessions read from storage.
    ///
    /// A hand-edited or older state document may be missing progress
    /// entries; readers tolerate that instead of failing.
    pub fn normalize(&mut self) {
        for stage in Stage::ALL {
            self.progress.entry(stage).or_default();
        }
    }
}
