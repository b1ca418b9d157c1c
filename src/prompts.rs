//! System prompts for the text-generation service.

use crate::generation::TemplateType;

/// System prompt for PRD assembly.
pub const PRD_SYSTEM_PROMPT: &str = "\
You are a product documentation writer. Produce a complete product \
requirements document in markdown from the discovery data you are given. \
Use clear headed sections, bulleted lists, and imperative requirement \
statements. Cover: overview, problem statement, target audience, market \
analysis, requirements, technical architecture, success metrics, and risks. \
Do not invent facts that are not in the discovery data.";

/// Template-specific instructions appended to the PRD prompt.
pub fn prd_template_instructions(template: TemplateType) -> &'static str {
    match template {
        TemplateType::Standard => "Template: standard. Produce the full document.",
        TemplateType::Lean => {
            "Template: lean. Keep each section to a short paragraph or list; \
             target a two-page document."
        }
        TemplateType::Technical => {
            "Template: technical. Expand the architecture and requirements \
             sections with implementation detail; keep market sections brief."
        }
    }
}
