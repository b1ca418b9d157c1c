//! PRD quality scoring engine.
//!
//! [`QualityEngine::assess`] scores a generated document against five
//! weighted criteria, using the originating session as ground truth for
//! requirement counts and research presence. It is a pure function of its
//! inputs: no hidden state, no randomness, identical inputs always produce
//! identical assessments. That determinism is load-bearing - the score feeds
//! both iterative improvement and automated gating.
//!
//! The concrete numeric thresholds and keyword lists are policy, collected
//! in [`QualityHeuristics`]; only determinism and the ordering/threshold
//! contracts are fixed.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::schema::{
    validate_stage_completion, MarketResearchData, RequirementsSynthesisData, Session, Stage,
    TechnicalFeasibilityData,
};

/// The five quality criteria with fixed weights.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Criterion {
    /// Document covers every canonical section at sufficient length. 25%.
    Completeness,
    /// Structure and actionable language. 20%.
    Clarity,
    /// Technology specificity, correlated with session feasibility data. 20%.
    TechnicalFeasibility,
    /// Market evidence, correlated with session research data. 15%.
    MarketValidation,
    /// Requirement count and structure from session data. 20%.
    RequirementsCoverage,
}

impl Criterion {
    /// All criteria in reporting order.
    pub const ALL: [Criterion; 5] = [
        Criterion::Completeness,
        Criterion::Clarity,
        Criterion::TechnicalFeasibility,
        Criterion::MarketValidation,
        Criterion::RequirementsCoverage,
    ];

    /// Fixed weight of this criterion in the overall score.
    pub fn weight(&self) -> f64 {
        match self {
            Criterion::Completeness => 0.25,
            Criterion::Clarity => 0.20,
            Criterion::TechnicalFeasibility => 0.20,
            Criterion::MarketValidation => 0.15,
            Criterion::RequirementsCoverage => 0.20,
        }
    }

    /// Criterion name as a wire string
    pub fn as_str(&self) -> &'static str {
        match self {
            Criterion::Completeness => "completeness",
            Criterion::Clarity => "clarity",
            Criterion::TechnicalFeasibility => "technical-feasibility",
            Criterion::MarketValidation => "market-validation",
            Criterion::RequirementsCoverage => "requirements-coverage",
        }
    }
}

impl std::fmt::Display for Criterion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Confidence in the overall score, derived from sub-score spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Sub-scores disagree or the mean is low.
    Low,
    /// Reasonable agreement.
    Medium,
    /// High mean, low spread.
    High,
}

/// Threshold-derived readiness signals.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Readiness {
    /// Overall score of at least 75.
    pub ready_for_development: bool,
    /// Overall score of at least 60.
    pub ready_for_task_generation: bool,
    /// Confidence in the assessment.
    pub confidence: ConfidenceLevel,
}

/// Complete quality assessment of one document.
///
/// Derived data: recomputed on demand, never partially updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QualityAssessment {
    /// Weighted overall score, 0-100.
    pub overall_score: u8,
    /// Sub-score per criterion, each independently 0-100.
    pub criteria: BTreeMap<Criterion, u8>,
    /// Human-readable gaps for criteria below the floor.
    pub gaps: Vec<String>,
    /// At least one recommendation per gapped criterion.
    pub recommendations: Vec<String>,
    /// Threshold-derived readiness signals.
    pub readiness: Readiness,
}

/// Optional structural hints from the document assembler.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StructureHints {
    /// Section titles the assembler claims to have produced.
    #[serde(default)]
    pub sections: Vec<String>,
}

/// Tunable scoring policy: thresholds and keyword lists.
#[derive(Debug, Clone)]
pub struct QualityHeuristics {
    /// Sub-score floor below which gaps are emitted.
    pub criterion_floor: u8,
    /// Word count at which the length signal saturates.
    pub full_length_words: usize,
    /// Word count below which a document counts as near-empty.
    pub near_empty_words: usize,
    /// Canonical PRD sections checked for completeness.
    pub canonical_sections: Vec<String>,
    /// Technology vocabulary for the feasibility signal.
    pub tech_terms: Vec<String>,
    /// Market vocabulary for the validation signal.
    pub market_terms: Vec<String>,
    /// Imperative/actionable vocabulary for the clarity signal.
    pub action_terms: Vec<String>,
}

impl Default for QualityHeuristics {
    fn default() -> Self {
        Self {
            criterion_floor: 70,
            full_length_words: 600,
            near_empty_words: 20,
            canonical_sections: [
                "overview",
                "problem statement",
                "target audience",
                "market analysis",
                "requirements",
                "technical architecture",
                "success metrics",
                "risks",
            ]
            .map(String::from)
            .to_vec(),
            tech_terms: [
                "architecture",
                "database",
                "api",
                "frontend",
                "backend",
                "infrastructure",
                "framework",
                "deployment",
                "scalability",
                "security",
            ]
            .map(String::from)
            .to_vec(),
            market_terms: [
                "competitor",
                "market size",
                "opportunity",
                "pricing",
                "segment",
                "demand",
                "differentiation",
            ]
            .map(String::from)
            .to_vec(),
            action_terms: ["must", "shall", "should", "will"].map(String::from).to_vec(),
        }
    }
}

/// Deterministic scorer over a heuristics policy.
#[derive(Debug, Clone, Default)]
pub struct QualityEngine {
    heuristics: QualityHeuristics,
}

impl QualityEngine {
    /// Create an engine with the given policy.
    pub fn new(heuristics: QualityHeuristics) -> Self {
        Self { heuristics }
    }

    /// Assess a document against the session that produced it.
    ///
    /// Never fails: an empty document or a session without stage data still
    /// yields a fully-populated assessment.
    pub fn assess(
        &self,
        document: &str,
        session: &Session,
        hints: Option<&StructureHints>,
    ) -> QualityAssessment {
        let doc_lower = document.to_lowercase();
        let word_count = document.split_whitespace().count();

        let mut criteria = BTreeMap::new();
        criteria.insert(
            Criterion::Completeness,
            self.score_completeness(&doc_lower, word_count, hints),
        );
        criteria.insert(Criterion::Clarity, self.score_clarity(document, &doc_lower));
        criteria.insert(
            Criterion::TechnicalFeasibility,
            self.score_technical_feasibility(&doc_lower, session),
        );
        criteria.insert(
            Criterion::MarketValidation,
            self.score_market_validation(&doc_lower, session),
        );
        criteria.insert(
            Criterion::RequirementsCoverage,
            self.score_requirements_coverage(word_count, session),
        );

        let overall = Criterion::ALL
            .iter()
            .map(|c| c.weight() * f64::from(criteria[c]))
            .sum::<f64>()
            .round()
            .clamp(0.0, 100.0) as u8;

        let (gaps, recommendations) = self.describe_gaps(&criteria, &doc_lower, session);

        QualityAssessment {
            overall_score: overall,
            readiness: self.readiness(overall, &criteria),
            criteria,
            gaps,
            recommendations,
        }
    }

    /// Length plus canonical section presence.
    fn score_completeness(
        &self,
        doc_lower: &str,
        word_count: usize,
        hints: Option<&StructureHints>,
    ) -> u8 {
        let length_score =
            40.0 * (word_count.min(self.heuristics.full_length_words) as f64)
                / (self.heuristics.full_length_words as f64);

        let hint_sections: Vec<String> = hints
            .map(|h| h.sections.iter().map(|s| s.to_lowercase()).collect())
            .unwrap_or_default();

        let total = self.heuristics.canonical_sections.len();
        let present = self
            .heuristics
            .canonical_sections
            .iter()
            .filter(|section| {
                doc_lower.contains(section.as_str())
                    || hint_sections.iter().any(|h| h.contains(section.as_str()))
            })
            .count();
        let section_score = if total == 0 {
            60.0
        } else {
            60.0 * present as f64 / total as f64
        };

        (length_score + section_score).round() as u8
    }

    /// Structural signals: headings, bullets, actionable language.
    fn score_clarity(&self, document: &str, doc_lower: &str) -> u8 {
        let headings = document
            .lines()
            .filter(|line| line.trim_start().starts_with('#'))
            .count();
        let bullets = document
            .lines()
            .filter(|line| {
                let trimmed = line.trim_start();
                trimmed.starts_with("- ")
                    || trimmed.starts_with("* ")
                    || trimmed
                        .split_once('.')
                        .map(|(head, _)| head.chars().all(|c| c.is_ascii_digit()) && !head.is_empty())
                        .unwrap_or(false)
            })
            .count();
        let action_hits: usize = self
            .heuristics
            .action_terms
            .iter()
            .map(|term| count_word(doc_lower, term))
            .sum();

        let heading_score = 35.0 * (headings.min(8) as f64) / 8.0;
        let bullet_score = 30.0 * (bullets.min(10) as f64) / 10.0;
        let action_score = 35.0 * (action_hits.min(10) as f64) / 10.0;

        (heading_score + bullet_score + action_score).round() as u8
    }

    /// Technology vocabulary plus correlation with the session's
    /// technical-feasibility stage data.
    fn score_technical_feasibility(&self, doc_lower: &str, session: &Session) -> u8 {
        let term_total = self.heuristics.tech_terms.len();
        let term_hits = self
            .heuristics
            .tech_terms
            .iter()
            .filter(|term| doc_lower.contains(term.as_str()))
            .count();
        let term_score = if term_total == 0 {
            50.0
        } else {
            50.0 * term_hits as f64 / term_total as f64
        };

        let data = stage_data(session, Stage::TechnicalFeasibility);
        let feasibility: TechnicalFeasibilityData =
            serde_json::from_value(data.clone()).unwrap_or_default();

        let stack_score = if feasibility.recommended_stack.is_empty() {
            0.0
        } else {
            let mentioned = feasibility
                .recommended_stack
                .iter()
                .filter(|choice| {
                    !choice.technology.trim().is_empty()
                        && doc_lower.contains(&choice.technology.to_lowercase())
                })
                .count();
            30.0 * mentioned as f64 / feasibility.recommended_stack.len() as f64
        };

        let stage_score =
            0.20 * f64::from(validate_stage_completion(Stage::TechnicalFeasibility, &data).score);

        (term_score + stack_score + stage_score).round() as u8
    }

    /// Market vocabulary plus correlation with the session's market-research
    /// stage data.
    fn score_market_validation(&self, doc_lower: &str, session: &Session) -> u8 {
        let term_total = self.heuristics.market_terms.len();
        let term_hits = self
            .heuristics
            .market_terms
            .iter()
            .filter(|term| doc_lower.contains(term.as_str()))
            .count();
        let term_score = if term_total == 0 {
            50.0
        } else {
            50.0 * term_hits as f64 / term_total as f64
        };

        let data = stage_data(session, Stage::MarketResearch);
        let market: MarketResearchData = serde_json::from_value(data.clone()).unwrap_or_default();

        let competitor_score = if market.competitors.is_empty() {
            0.0
        } else {
            let mentioned = market
                .competitors
                .iter()
                .filter(|competitor| {
                    !competitor.name.trim().is_empty()
                        && doc_lower.contains(&competitor.name.to_lowercase())
                })
                .count();
            20.0 * mentioned as f64 / market.competitors.len() as f64
        };

        let stage_score =
            0.30 * f64::from(validate_stage_completion(Stage::MarketResearch, &data).score);

        (term_score + competitor_score + stage_score).round() as u8
    }

    /// Requirement count and structure from session data, reusing the stage
    /// validator's field-presence rule. Scaled by a document-presence factor:
    /// an empty document carries no coverage regardless of session data.
    fn score_requirements_coverage(&self, word_count: usize, session: &Session) -> u8 {
        let data = stage_data(session, Stage::RequirementsSynthesis);
        let synthesis: RequirementsSynthesisData =
            serde_json::from_value(data.clone()).unwrap_or_default();

        let fr_count = synthesis.functional_requirements.len();
        let nfr_count = synthesis.non_functional_requirements.len();
        let count_score = 40.0 * (fr_count.min(10) as f64) / 10.0
            + 20.0 * (nfr_count.min(5) as f64) / 5.0;

        let structure_score = if fr_count == 0 {
            0.0
        } else {
            let well_formed = synthesis
                .functional_requirements
                .iter()
                .filter(|fr| {
                    !fr.id.trim().is_empty()
                        && !fr.title.trim().is_empty()
                        && !fr.description.trim().is_empty()
                })
                .count();
            25.0 * well_formed as f64 / fr_count as f64
        };

        let stage_score =
            0.15 * f64::from(validate_stage_completion(Stage::RequirementsSynthesis, &data).score);

        let doc_factor = (word_count.min(self.heuristics.near_empty_words) as f64)
            / (self.heuristics.near_empty_words as f64);

        ((count_score + structure_score + stage_score) * doc_factor).round() as u8
    }

    /// One gap and at least one recommendation per criterion below the floor.
    fn describe_gaps(
        &self,
        criteria: &BTreeMap<Criterion, u8>,
        doc_lower: &str,
        session: &Session,
    ) -> (Vec<String>, Vec<String>) {
        let mut gaps = Vec::new();
        let mut recommendations = Vec::new();

        for criterion in Criterion::ALL {
            let score = criteria[&criterion];
            if score >= self.heuristics.criterion_floor {
                continue;
            }

            match criterion {
                Criterion::Completeness => {
                    let missing: Vec<&str> = self
                        .heuristics
                        .canonical_sections
                        .iter()
                        .filter(|s| !doc_lower.contains(s.as_str()))
                        .map(|s| s.as_str())
                        .collect();
                    if missing.is_empty() {
                        gaps.push(format!(
                            "Document is too short for its scope (completeness {}/100)",
                            score
                        ));
                    } else {
                        gaps.push(format!("Missing sections: {}", missing.join(", ")));
                    }
                    recommendations
                        .push("Expand the document to cover every canonical PRD section".to_string());
                }
                Criterion::Clarity => {
                    gaps.push(format!(
                        "Document structure is weak (clarity {}/100): few headings, lists, or actionable statements",
                        score
                    ));
                    recommendations.push(
                        "Break content into headed sections with bulleted, imperative requirements"
                            .to_string(),
                    );
                }
                Criterion::TechnicalFeasibility => {
                    gaps.push(format!(
                        "Technical approach is underspecified (feasibility {}/100)",
                        score
                    ));
                    recommendations.push(
                        "Name the recommended stack per layer and describe the architecture"
                            .to_string(),
                    );
                }
                Criterion::MarketValidation => {
                    gaps.push(format!(
                        "Market evidence is thin (validation {}/100)",
                        score
                    ));
                    recommendations.push(
                        "Add competitor analysis, market sizing, and opportunity framing"
                            .to_string(),
                    );
                }
                Criterion::RequirementsCoverage => {
                    let data = stage_data(session, Stage::RequirementsSynthesis);
                    let missing =
                        validate_stage_completion(Stage::RequirementsSynthesis, &data).missing_fields;
                    if missing.is_empty() {
                        gaps.push(format!(
                            "Requirements coverage is insufficient ({}/100)",
                            score
                        ));
                    } else {
                        gaps.push(format!(
                            "Requirements synthesis is missing: {}",
                            missing.join(", ")
                        ));
                    }
                    recommendations.push(
                        "Capture structured functional and non-functional requirements with ids and descriptions"
                            .to_string(),
                    );
                }
            }
        }

        (gaps, recommendations)
    }

    /// Threshold lookups plus spread-based confidence.
    fn readiness(&self, overall: u8, criteria: &BTreeMap<Criterion, u8>) -> Readiness {
        let scores: Vec<f64> = Criterion::ALL.iter().map(|c| f64::from(criteria[c])).collect();
        let mean = scores.iter().sum::<f64>() / scores.len() as f64;
        let variance =
            scores.iter().map(|s| (s - mean).powi(2)).sum::<f64>() / scores.len() as f64;
        let spread = variance.sqrt();

        let confidence = if mean >= 70.0 && spread <= 15.0 {
            ConfidenceLevel::High
        } else if mean >= 50.0 && spread <= 25.0 {
            ConfidenceLevel::Medium
        } else {
            ConfidenceLevel::Low
        };

        Readiness {
            ready_for_development: overall >= 75,
            ready_for_task_generation: overall >= 60,
            confidence,
        }
    }
}

/// Assess with the default heuristics policy.
pub fn assess_prd_quality(
    document: &str,
    session: &Session,
    hints: Option<&StructureHints>,
) -> QualityAssessment {
    QualityEngine::default().assess(document, session, hints)
}

/// One stage's payload, or an empty object when absent.
fn stage_data(session: &Session, stage: Stage) -> Value {
    session
        .stage_progress(stage)
        .map(|p| p.data.clone())
        .unwrap_or_else(|| Value::Object(serde_json::Map::new()))
}

/// Count whole-word occurrences of `word` in lowercased text.
fn count_word(haystack_lower: &str, word: &str) -> usize {
    haystack_lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| *token == word)
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::SessionMetadata;
    use serde_json::json;

    fn empty_session() -> Session {
        Session::new("Quality Test", SessionMetadata::default())
    }

    fn session_with_requirements() -> Session {
        let mut session = empty_session();
        if let Some(progress) = session.progress.get_mut(&Stage::RequirementsSynthesis) {
            progress.data = json!({
                "functional_requirements": [
                    { "id": "FR-1", "title": "Sign up", "description": "Users can register" },
                    { "id": "FR-2", "title": "Checkout", "description": "Users can pay" },
                ],
                "non_functional_requirements": [
                    { "id": "NFR-1", "title": "Latency", "description": "p99 under 200ms",
                      "type": "performance", "criteria": ["p99 < 200ms"] },
                ],
                "user_stories": [{ "id": "US-1", "story": "As a shopper I can buy" }],
            });
        }
        session
    }

    #[test]
    fn test_assessment_is_deterministic() {
        let session = session_with_requirements();
        let doc = "# Overview\n\nThe system must handle checkout.\n\n- requirement one\n";

        let a = assess_prd_quality(doc, &session, None);
        let b = assess_prd_quality(doc, &session, None);
        assert_eq!(a, b);
    }

    #[test]
    fn test_empty_document_scores_below_twenty() {
        let session = session_with_requirements();
        let assessment = assess_prd_quality("", &session, None);
        assert!(assessment.overall_score < 20);
        assert_eq!(assessment.criteria.len(), 5);
    }

    #[test]
    fn test_session_without_data_still_yields_full_assessment() {
        let session = empty_session();
        let assessment = assess_prd_quality("", &session, None);

        assert_eq!(assessment.criteria.len(), 5);
        assert!(!assessment.gaps.is_empty());
        assert!(!assessment.recommendations.is_empty());
        assert!(!assessment.readiness.ready_for_task_generation);
    }

    #[test]
    fn test_gaps_emitted_per_criterion_below_floor() {
        let session = empty_session();
        let assessment = assess_prd_quality("# Simple App\n\nThis is an app.", &session, None);

        assert!(assessment.overall_score < 40);
        let below_floor = Criterion::ALL
            .iter()
            .filter(|c| assessment.criteria[c] < 70)
            .count();
        assert!(assessment.gaps.len() >= below_floor);
        assert!(assessment.recommendations.len() >= below_floor);
    }

    #[test]
    fn test_all_sections_never_score_below_none() {
        let session = session_with_requirements();

        let with_sections = "# Overview\n# Problem Statement\n# Target Audience\n\
                             # Market Analysis\n# Requirements\n# Technical Architecture\n\
                             # Success Metrics\n# Risks\n\nBody text here.";
        let without_sections = "Body text here.";

        let a = assess_prd_quality(with_sections, &session, None);
        let b = assess_prd_quality(without_sections, &session, None);
        assert!(a.overall_score >= b.overall_score);
        assert!(
            a.criteria[&Criterion::Completeness] > b.criteria[&Criterion::Completeness]
        );
    }

    #[test]
    fn test_readiness_boundaries_are_exact() {
        let engine = QualityEngine::default();
        let mut criteria = BTreeMap::new();
        for criterion in Criterion::ALL {
            criteria.insert(criterion, 75u8);
        }

        let at_75 = engine.readiness(75, &criteria);
        assert!(at_75.ready_for_development);
        assert!(at_75.ready_for_task_generation);

        let at_74 = engine.readiness(74, &criteria);
        assert!(!at_74.ready_for_development);
        assert!(at_74.ready_for_task_generation);

        let at_60 = engine.readiness(60, &criteria);
        assert!(at_60.ready_for_task_generation);

        let at_59 = engine.readiness(59, &criteria);
        assert!(!at_59.ready_for_task_generation);
    }

    #[test]
    fn test_confidence_tracks_mean_and_spread() {
        let engine = QualityEngine::default();

        let mut uniform_high = BTreeMap::new();
        for criterion in Criterion::ALL {
            uniform_high.insert(criterion, 80u8);
        }
        assert_eq!(
            engine.readiness(80, &uniform_high).confidence,
            ConfidenceLevel::High
        );

        let mut scattered = BTreeMap::new();
        scattered.insert(Criterion::Completeness, 95u8);
        scattered.insert(Criterion::Clarity, 10u8);
        scattered.insert(Criterion::TechnicalFeasibility, 90u8);
        scattered.insert(Criterion::MarketValidation, 15u8);
        scattered.insert(Criterion::RequirementsCoverage, 85u8);
        assert_eq!(
            engine.readiness(65, &scattered).confidence,
            ConfidenceLevel::Low
        );
    }

    #[test]
    fn test_criterion_weights_sum_to_one() {
        let total: f64 = Criterion::ALL.iter().map(|c| c.weight()).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_requirements_coverage_uses_session_counts() {
        let doc = "# Requirements\n\nThe system must support the flows below in detail, \
                   covering registration, checkout, and post-purchase support paths.";

        let with_reqs = assess_prd_quality(doc, &session_with_requirements(), None);
        let without_reqs = assess_prd_quality(doc, &empty_session(), None);

        assert!(
            with_reqs.criteria[&Criterion::RequirementsCoverage]
                > without_reqs.criteria[&Criterion::RequirementsCoverage]
        );
    }

    #[test]
    fn test_structure_hints_count_toward_completeness() {
        let session = empty_session();
        let hints = StructureHints {
            sections: vec!["Overview".to_string(), "Requirements".to_string()],
        };

        let with_hints = assess_prd_quality("short body", &session, Some(&hints));
        let without_hints = assess_prd_quality("short body", &session, None);
        assert!(
            with_hints.criteria[&Criterion::Completeness]
                >= without_hints.criteria[&Criterion::Completeness]
        );
    }
}
