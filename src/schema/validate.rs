//! Stage payload validation and completion scoring.
//!
//! Two distinct checks live here. `validate_stage_data` is the persistence
//! gate: a merged payload must have the right shape before the state machine
//! saves it. `validate_stage_completion` is the advancement gate: it counts
//! required-field presence into a 0-100 score. The same presence rule feeds
//! the quality engine's requirements-coverage signal.

use serde_json::Value;

use super::payloads::{
    DocumentGenerationData, MarketResearchData, ProblemFramingData, RequirementsSynthesisData,
    TechnicalFeasibilityData,
};
use super::Stage;
use crate::error::ValidationError;

/// Maximum accepted project name length.
pub const MAX_PROJECT_NAME_LEN: usize = 120;

/// Required fields and minimum completion score for one stage.
#[derive(Debug, Clone, Copy)]
pub struct StageRequirement {
    /// Top-level fields that must be present for full completion.
    pub required_fields: &'static [&'static str],
    /// Minimum `validate_stage_completion` score to accept completion.
    pub min_score: u8,
}

/// Expected JSON kind of a known payload field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldKind {
    Text,
    List,
}

/// Requirement policy for a stage.
pub fn requirements_for(stage: Stage) -> StageRequirement {
    match stage {
        Stage::ProblemFraming => StageRequirement {
            required_fields: &["problem_statement", "target_audience", "success_criteria"],
            min_score: 67,
        },
        Stage::MarketResearch => StageRequirement {
            required_fields: &[
                "competitors",
                "market_size",
                "opportunities",
                "target_personas",
            ],
            min_score: 75,
        },
        Stage::TechnicalFeasibility => StageRequirement {
            required_fields: &[
                "recommended_stack",
                "architecture_overview",
                "complexity_ratings",
                "risks",
            ],
            min_score: 75,
        },
        Stage::RequirementsSynthesis => StageRequirement {
            required_fields: &[
                "functional_requirements",
                "non_functional_requirements",
                "user_stories",
            ],
            min_score: 67,
        },
        Stage::PrdGeneration => StageRequirement {
            required_fields: &["generated_content", "output_path"],
            min_score: 50,
        },
    }
}

/// Known top-level fields and their kinds, per stage.
fn field_kinds(stage: Stage) -> &'static [(&'static str, FieldKind)] {
    match stage {
        Stage::ProblemFraming => &[
            ("problem_statement", FieldKind::Text),
            ("target_audience", FieldKind::Text),
            ("success_criteria", FieldKind::List),
            ("constraints", FieldKind::List),
            ("assumptions", FieldKind::List),
            ("stakeholders", FieldKind::List),
        ],
        Stage::MarketResearch => &[
            ("competitors", FieldKind::List),
            ("market_size", FieldKind::Text),
            ("opportunities", FieldKind::List),
            ("threats", FieldKind::List),
            ("target_personas", FieldKind::List),
        ],
        Stage::TechnicalFeasibility => &[
            ("recommended_stack", FieldKind::List),
            ("architecture_overview", FieldKind::Text),
            ("complexity_ratings", FieldKind::List),
            ("risks", FieldKind::List),
        ],
        Stage::RequirementsSynthesis => &[
            ("functional_requirements", FieldKind::List),
            ("non_functional_requirements", FieldKind::List),
            ("user_stories", FieldKind::List),
            ("dependencies", FieldKind::List),
        ],
        Stage::PrdGeneration => &[
            ("generated_content", FieldKind::Text),
            ("output_path", FieldKind::Text),
        ],
    }
}

/// Result of the stage completion check.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct StageValidation {
    /// Whether the score clears the stage's minimum.
    pub valid: bool,
    /// Rounded percentage of required fields present.
    pub score: u8,
    /// Count of required fields present.
    pub completed_fields: usize,
    /// Count of required fields overall.
    pub total_fields: usize,
    /// Required fields still missing.
    pub missing_fields: Vec<String>,
}

/// Field-presence rule shared by the completion gate and the quality engine:
/// present means a non-empty string or a non-empty list.
pub fn field_present(data: &Value, field: &str) -> bool {
    match data.get(field) {
        Some(Value::String(s)) => !s.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        _ => false,
    }
}

/// Score submitted stage data against the stage's requirement policy.
///
/// Pure function: same inputs, same result.
pub fn validate_stage_completion(stage: Stage, data: &Value) -> StageValidation {
    let requirement = requirements_for(stage);
    let total_fields = requirement.required_fields.len();

    let mut completed_fields = 0;
    let mut missing_fields = Vec::new();
    for field in requirement.required_fields {
        if field_present(data, field) {
            completed_fields += 1;
        } else {
            missing_fields.push((*field).to_string());
        }
    }

    let score = if total_fields == 0 {
        100
    } else {
        ((100.0 * completed_fields as f64 / total_fields as f64).round()) as u8
    };

    StageValidation {
        valid: score >= requirement.min_score,
        score,
        completed_fields,
        total_fields,
        missing_fields,
    }
}

/// Shape-check a merged stage payload before it is persisted.
///
/// Unknown keys are tolerated; known keys must have the declared kind, and
/// the whole object must deserialize into the stage's typed schema.
pub fn validate_stage_data(stage: Stage, data: &Value) -> Result<(), ValidationError> {
    let object = data.as_object().ok_or_else(|| {
        ValidationError::new("data", format!("{} payload must be a JSON object", stage))
    })?;

    for (field, kind) in field_kinds(stage) {
        let Some(value) = object.get(*field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        let ok = match kind {
            FieldKind::Text => value.is_string(),
            FieldKind::List => value.is_array(),
        };
        if !ok {
            let expected = match kind {
                FieldKind::Text => "a string",
                FieldKind::List => "a list",
            };
            return Err(ValidationError::new(*field, format!("must be {}", expected)));
        }
    }

    let nested = match stage {
        Stage::ProblemFraming => {
            serde_json::from_value::<ProblemFramingData>(data.clone()).map(|_| ())
        }
        Stage::MarketResearch => {
            serde_json::from_value::<MarketResearchData>(data.clone()).map(|_| ())
        }
        Stage::TechnicalFeasibility => {
            serde_json::from_value::<TechnicalFeasibilityData>(data.clone()).map(|_| ())
        }
        Stage::RequirementsSynthesis => {
            serde_json::from_value::<RequirementsSynthesisData>(data.clone()).map(|_| ())
        }
        Stage::PrdGeneration => {
            serde_json::from_value::<DocumentGenerationData>(data.clone()).map(|_| ())
        }
    };

    nested.map_err(|e| ValidationError::new(stage.as_str(), e.to_string()))
}

/// Validate a project name: non-blank, bounded length.
pub fn validate_project_name(name: &str) -> Result<(), ValidationError> {
    if name.trim().is_empty() {
        return Err(ValidationError::new(
            "project_name",
            "must not be empty",
        ));
    }
    if name.len() > MAX_PROJECT_NAME_LEN {
        return Err(ValidationError::new(
            "project_name",
            format!("must be at most {} characters", MAX_PROJECT_NAME_LEN),
        ));
    }
    Ok(())
}

/// Session-level invariants checked before every persist.
pub fn validate_session(session: &super::Session) -> Result<(), ValidationError> {
    validate_project_name(&session.project_name)?;

    for stage in Stage::ALL {
        let Some(progress) = session.progress.get(&stage) else {
            return Err(ValidationError::new(
                "progress",
                format!("missing progress entry for stage {}", stage),
            ));
        };

        let completed = progress.status == super::StageStatus::Completed;
        if completed != progress.completed_at.is_some() {
            return Err(ValidationError::new(
                "completed_at",
                format!(
                    "stage {} has status {} but completed_at {}",
                    stage,
                    progress.status,
                    if progress.completed_at.is_some() {
                        "set"
                    } else {
                        "unset"
                    }
                ),
            ));
        }

        if progress.completion_score > 100 {
            return Err(ValidationError::new(
                "completion_score",
                format!("stage {} score exceeds 100", stage),
            ));
        }
    }

    if !session.progress.contains_key(&session.stage) {
        return Err(ValidationError::new(
            "stage",
            format!("current stage {} has no progress entry", session.stage),
        ));
    }

    Ok(())
}
