//! Document assembly: turns a completed session into a PRD.

use serde::{Deserialize, Serialize};
use tracing::info;

use super::client::GenerationClient;
use super::types::{GenerationRequest, Message};
use crate::error::{AppResult, SessionError};
use crate::prompts::{prd_template_instructions, PRD_SYSTEM_PROMPT};
use crate::quality::{QualityAssessment, QualityEngine, StructureHints};
use crate::schema::{
    MarketResearchData, ProblemFramingData, RequirementsSynthesisData, Session, Stage,
    TechnicalFeasibilityData,
};

/// PRD template flavor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateType {
    /// Full PRD with all sections.
    #[default]
    Standard,
    /// Short form for early validation.
    Lean,
    /// Architecture-heavy variant.
    Technical,
}

impl std::str::FromStr for TemplateType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(TemplateType::Standard),
            "lean" => Ok(TemplateType::Lean),
            "technical" => Ok(TemplateType::Technical),
            _ => Err(format!("Unknown template type: {}", s)),
        }
    }
}

/// Options for one PRD generation.
#[derive(Debug, Clone, Default)]
pub struct PrdOptions {
    /// Template flavor.
    pub template_type: TemplateType,
    /// Whether to fold research summaries into the prompt.
    pub include_research_data: bool,
    /// Where the caller intends to write the document.
    pub output_path: Option<String>,
}

/// A generated PRD with its structure and quality assessment.
#[derive(Debug, Clone)]
pub struct GeneratedPrd {
    /// Full document text.
    pub content: String,
    /// Section headings found in the document.
    pub structure: Vec<String>,
    /// Quality assessment of the generated text against the session.
    pub quality: QualityAssessment,
}

/// Assembles PRDs from completed sessions via the generation service.
pub struct PrdGenerator {
    client: GenerationClient,
    engine: QualityEngine,
}

impl PrdGenerator {
    /// Create a generator over the generation client.
    pub fn new(client: GenerationClient) -> Self {
        Self {
            client,
            engine: QualityEngine::default(),
        }
    }

    /// Generate a PRD for the session.
    ///
    /// Fails with the requirements-incomplete error when the
    /// requirements-synthesis stage has not been completed; the check reads
    /// only the public session shape.
    pub async fn generate(
        &self,
        session: &Session,
        options: &PrdOptions,
    ) -> AppResult<GeneratedPrd> {
        if !session.requirements_completed() {
            return Err(SessionError::RequirementsIncomplete.into());
        }

        let prompt = build_prompt(session, options);
        let request = GenerationRequest::with_messages(vec![
            Message::system(PRD_SYSTEM_PROMPT),
            Message::user(prompt),
        ]);

        let response = self.client.generate(request).await?;
        let content = response.content;
        let structure = parse_structure(&content);
        let hints = StructureHints {
            sections: structure.clone(),
        };
        let quality = self.engine.assess(&content, session, Some(&hints));

        info!(
            session_id = %session.id,
            sections = structure.len(),
            overall = quality.overall_score,
            "PRD generated"
        );

        Ok(GeneratedPrd {
            content,
            structure,
            quality,
        })
    }
}

/// Section headings, in order of appearance.
fn parse_structure(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let trimmed = line.trim_start();
            if trimmed.starts_with('#') {
                Some(trimmed.trim_start_matches('#').trim().to_string())
            } else {
                None
            }
        })
        .filter(|heading| !heading.is_empty())
        .collect()
}

/// Fold session data into the generation prompt.
fn build_prompt(session: &Session, options: &PrdOptions) -> String {
    let mut sections = Vec::new();
    sections.push(format!("Project: {}", session.project_name));
    sections.push(prd_template_instructions(options.template_type).to_string());

    let framing: ProblemFramingData = typed_stage(session, Stage::ProblemFraming);
    if !framing.problem_statement.is_empty() {
        sections.push(format!("Problem: {}", framing.problem_statement));
        sections.push(format!("Audience: {}", framing.target_audience));
        if !framing.success_criteria.is_empty() {
            sections.push(format!(
                "Success criteria: {}",
                framing.success_criteria.join("; ")
            ));
        }
    }

    let market: MarketResearchData = typed_stage(session, Stage::MarketResearch);
    if !market.competitors.is_empty() || !market.market_size.is_empty() {
        let competitors: Vec<&str> =
            market.competitors.iter().map(|c| c.name.as_str()).collect();
        sections.push(format!(
            "Market: size {}; competitors: {}",
            market.market_size,
            competitors.join(", ")
        ));
    }

    let feasibility: TechnicalFeasibilityData = typed_stage(session, Stage::TechnicalFeasibility);
    if !feasibility.recommended_stack.is_empty() {
        let stack: Vec<String> = feasibility
            .recommended_stack
            .iter()
            .map(|choice| format!("{}: {}", choice.layer, choice.technology))
            .collect();
        sections.push(format!("Recommended stack: {}", stack.join("; ")));
    }
    if !feasibility.architecture_overview.is_empty() {
        sections.push(format!(
            "Architecture: {}",
            feasibility.architecture_overview
        ));
    }

    let synthesis: RequirementsSynthesisData = typed_stage(session, Stage::RequirementsSynthesis);
    if !synthesis.functional_requirements.is_empty() {
        let requirements: Vec<String> = synthesis
            .functional_requirements
            .iter()
            .map(|fr| format!("{} {}: {}", fr.id, fr.title, fr.description))
            .collect();
        sections.push(format!(
            "Functional requirements:\n{}",
            requirements.join("\n")
        ));
    }
    if !synthesis.non_functional_requirements.is_empty() {
        let requirements: Vec<String> = synthesis
            .non_functional_requirements
            .iter()
            .map(|nfr| format!("{} {} ({})", nfr.id, nfr.title, nfr.requirement_type))
            .collect();
        sections.push(format!(
            "Non-functional requirements:\n{}",
            requirements.join("\n")
        ));
    }

    if options.include_research_data {
        let research = &session.research_data;
        let mut findings = Vec::new();
        for record in research
            .market_analysis
            .iter()
            .chain(research.technical_validation.iter())
            .chain(research.competitive_analysis.iter())
            .chain(research.general.iter())
            .filter(|record| record.success)
        {
            if let Some(results) = &record.results {
                findings.push(format!("[{}] {}", record.query_type, results));
            }
        }
        if !findings.is_empty() {
            sections.push(format!("Research findings:\n{}", findings.join("\n")));
        }
    }

    sections.join("\n\n")
}

/// Deserialize one stage's payload, defaulting on absence or mismatch.
fn typed_stage<T: serde::de::DeserializeOwned + Default>(session: &Session, stage: Stage) -> T {
    session
        .stage_progress(stage)
        .and_then(|p| serde_json::from_value(p.data.clone()).ok())
        .unwrap_or_default()
}
