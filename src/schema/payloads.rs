//! Typed payload schemas for each discovery stage.
//!
//! Stage data is stored as a JSON object and shallow-merged on update, so
//! every field here defaults: a partial payload is always deserializable.
//! Validation deserializes the merged object into these types before it is
//! ever persisted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Problem framing stage payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProblemFramingData {
    /// What problem is being solved.
    #[serde(default)]
    pub problem_statement: String,
    /// Who has the problem.
    #[serde(default)]
    pub target_audience: String,
    /// How success will be measured.
    #[serde(default)]
    pub success_criteria: Vec<String>,
    /// Known constraints.
    #[serde(default)]
    pub constraints: Vec<String>,
    /// Working assumptions.
    #[serde(default)]
    pub assumptions: Vec<String>,
    /// People and roles affected.
    #[serde(default)]
    pub stakeholders: Vec<String>,
}

/// One competitor entry.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Competitor {
    /// Competitor name.
    #[serde(default)]
    pub name: String,
    /// Free-form notes on positioning.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// One target persona.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Persona {
    /// Persona name.
    #[serde(default)]
    pub name: String,
    /// Who they are and what they need.
    #[serde(default)]
    pub description: String,
}

/// Market research stage payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MarketResearchData {
    /// Competitor landscape.
    #[serde(default)]
    pub competitors: Vec<Competitor>,
    /// Market size estimate, as prose.
    #[serde(default)]
    pub market_size: String,
    /// Identified opportunities.
    #[serde(default)]
    pub opportunities: Vec<String>,
    /// Identified threats.
    #[serde(default)]
    pub threats: Vec<String>,
    /// Target personas.
    #[serde(default)]
    pub target_personas: Vec<Persona>,
}

/// One technology choice for an architectural layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StackChoice {
    /// Layer name (frontend, backend, database, ...).
    #[serde(default)]
    pub layer: String,
    /// Chosen technology.
    #[serde(default)]
    pub technology: String,
    /// Why this choice.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
}

/// Implementation complexity level for one layer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComplexityLevel {
    /// Routine work.
    Low,
    /// Needs attention.
    #[default]
    Medium,
    /// Significant effort or risk.
    High,
}

/// Complexity rating for one architectural layer.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComplexityRating {
    /// Layer name.
    #[serde(default)]
    pub layer: String,
    /// Assessed complexity.
    #[serde(default)]
    pub rating: ComplexityLevel,
}

/// One identified technical risk.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Risk {
    /// What could go wrong.
    #[serde(default)]
    pub description: String,
    /// How it will be mitigated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mitigation: Option<String>,
}

/// Technical feasibility stage payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechnicalFeasibilityData {
    /// Recommended technology per layer.
    #[serde(default)]
    pub recommended_stack: Vec<StackChoice>,
    /// Prose description of the architecture.
    #[serde(default)]
    pub architecture_overview: String,
    /// Complexity rating per layer.
    #[serde(default)]
    pub complexity_ratings: Vec<ComplexityRating>,
    /// Risks and mitigations.
    #[serde(default)]
    pub risks: Vec<Risk>,
}

/// Requirement priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequirementPriority {
    /// Must ship.
    High,
    /// Should ship.
    #[default]
    Medium,
    /// Nice to have.
    Low,
}

/// One functional requirement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionalRequirement {
    /// Stable requirement id (e.g. "FR-1").
    #[serde(default)]
    pub id: String,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Full description.
    #[serde(default)]
    pub description: String,
    /// Priority.
    #[serde(default)]
    pub priority: RequirementPriority,
    /// Functional area.
    #[serde(default)]
    pub category: String,
}

/// One non-functional requirement.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NonFunctionalRequirement {
    /// Stable requirement id (e.g. "NFR-1").
    #[serde(default)]
    pub id: String,
    /// Short title.
    #[serde(default)]
    pub title: String,
    /// Full description.
    #[serde(default)]
    pub description: String,
    /// Quality attribute (performance, security, ...).
    #[serde(default, rename = "type")]
    pub requirement_type: String,
    /// Measurable acceptance criteria.
    #[serde(default)]
    pub criteria: Vec<String>,
}

/// One user story.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserStory {
    /// Stable story id (e.g. "US-1").
    #[serde(default)]
    pub id: String,
    /// The story text.
    #[serde(default)]
    pub story: String,
}

/// Dependency edge between two requirements.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DependencyEdge {
    /// Requirement id that depends.
    #[serde(default)]
    pub from: String,
    /// Requirement id depended upon.
    #[serde(default)]
    pub to: String,
}

/// Requirements synthesis stage payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequirementsSynthesisData {
    /// Functional requirements.
    #[serde(default)]
    pub functional_requirements: Vec<FunctionalRequirement>,
    /// Non-functional requirements.
    #[serde(default)]
    pub non_functional_requirements: Vec<NonFunctionalRequirement>,
    /// User stories.
    #[serde(default)]
    pub user_stories: Vec<UserStory>,
    /// Dependency edges between requirements.
    #[serde(default)]
    pub dependencies: Vec<DependencyEdge>,
}

/// PRD generation stage payload.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentGenerationData {
    /// The generated document text.
    #[serde(default)]
    pub generated_content: String,
    /// Quality assessment snapshot taken at generation time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quality_snapshot: Option<serde_json::Value>,
    /// Where the document was written.
    #[serde(default)]
    pub output_path: String,
    /// When the document was generated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_at: Option<DateTime<Utc>>,
}
