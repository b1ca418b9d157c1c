use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use tracing::info;

use super::SharedState;
use crate::error::{AppError, McpError, McpResult};
use crate::generation::{PrdOptions, TemplateType};
use crate::quality::StructureHints;
use crate::research::ProviderContext;
use crate::schema::{QueryType, SessionMetadata, Stage};

/// Route tool calls to appropriate handlers
pub async fn handle_tool_call(
    state: &SharedState,
    tool_name: &str,
    arguments: Option<Value>,
) -> McpResult<Value> {
    info!(tool = %tool_name, "Routing tool call");

    match tool_name {
        // Session lifecycle
        "discovery_start" => handle_start(state, arguments).await,
        "discovery_resume" => handle_resume(state, arguments).await,
        "discovery_status" => handle_status(state, arguments).await,
        "discovery_cancel" => handle_cancel(state, arguments).await,
        // Stage progression
        "discovery_update_stage" => handle_update_stage(state, arguments).await,
        "discovery_complete_stage" => handle_complete_stage(state, arguments).await,
        "discovery_validate_stage" => handle_validate_stage(state, arguments).await,
        // Research
        "research_run" => handle_research_run(state, arguments).await,
        // Document assembly and scoring
        "prd_generate" => handle_prd_generate(state, arguments).await,
        "prd_assess" => handle_prd_assess(state, arguments).await,
        _ => Err(McpError::UnknownTool {
            tool_name: tool_name.to_string(),
        }),
    }
}

/// Parse tool arguments into typed parameters
fn parse_arguments<T: DeserializeOwned>(tool_name: &str, arguments: Option<Value>) -> McpResult<T> {
    let arguments = arguments.unwrap_or_else(|| Value::Object(Default::default()));
    serde_json::from_value(arguments).map_err(|e| McpError::InvalidParameters {
        tool_name: tool_name.to_string(),
        message: e.to_string(),
    })
}

/// Map an application failure onto a tool error, keeping the stable error
/// code as a machine-extractable prefix.
fn execution_error(err: AppError) -> McpError {
    McpError::ExecutionFailed {
        message: format!("{}: {}", err.code(), err),
    }
}

/// Parse a stage wire name, surfacing the invalid-stage code.
fn parse_stage(stage: &str) -> McpResult<Stage> {
    stage
        .parse::<Stage>()
        .map_err(|e| execution_error(e.into()))
}

async fn handle_start(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct StartParams {
        project_name: String,
        #[serde(default)]
        preferences: Option<Value>,
        #[serde(default)]
        tech_stack_hints: Vec<String>,
        #[serde(default)]
        constraints: Vec<String>,
    }

    let params: StartParams = parse_arguments("discovery_start", arguments)?;
    let metadata = SessionMetadata {
        user_preferences: params.preferences,
        tech_stack_hints: params.tech_stack_hints,
        constraints: params.constraints,
    };

    let session = state
        .manager
        .create_session(&params.project_name, metadata)
        .await
        .map_err(execution_error)?;

    serde_json::to_value(session).map_err(McpError::Json)
}

async fn handle_resume(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct ResumeParams {
        session_id: String,
    }

    let params: ResumeParams = parse_arguments("discovery_resume", arguments)?;
    let session = state
        .manager
        .resume_session(&params.session_id)
        .await
        .map_err(execution_error)?;

    serde_json::to_value(session).map_err(McpError::Json)
}

async fn handle_status(state: &SharedState, _arguments: Option<Value>) -> McpResult<Value> {
    let session = state
        .manager
        .get_current_session()
        .await
        .map_err(execution_error)?;

    match session {
        Some(session) => {
            let stages: Vec<Value> = Stage::ALL
                .iter()
                .filter_map(|stage| {
                    session.stage_progress(*stage).map(|progress| {
                        json!({
                            "stage": stage.as_str(),
                            "status": progress.status,
                            "completion_score": progress.completion_score,
                        })
                    })
                })
                .collect();

            Ok(json!({
                "session_id": session.id,
                "project_name": session.project_name,
                "stage": session.stage,
                "status": session.status,
                "stages": stages,
                "research_queries": session.research_data.total_queries(),
                "last_updated": session.last_updated,
            }))
        }
        None => Ok(json!({ "session_id": null })),
    }
}

async fn handle_cancel(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct CancelParams {
        session_id: String,
    }

    let params: CancelParams = parse_arguments("discovery_cancel", arguments)?;
    let session = state
        .manager
        .cancel_session(&params.session_id)
        .await
        .map_err(execution_error)?;

    serde_json::to_value(session).map_err(McpError::Json)
}

async fn handle_update_stage(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct UpdateParams {
        session_id: String,
        stage: String,
        data: Value,
    }

    let params: UpdateParams = parse_arguments("discovery_update_stage", arguments)?;
    let stage = parse_stage(&params.stage)?;

    let session = state
        .manager
        .update_session_stage(&params.session_id, stage, params.data)
        .await
        .map_err(execution_error)?;

    serde_json::to_value(session).map_err(McpError::Json)
}

async fn handle_complete_stage(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct CompleteParams {
        session_id: String,
        stage: String,
        #[serde(default)]
        data: Option<Value>,
        #[serde(default)]
        completion_score: Option<u8>,
    }

    let params: CompleteParams = parse_arguments("discovery_complete_stage", arguments)?;
    let stage = parse_stage(&params.stage)?;
    let final_data = params
        .data
        .unwrap_or_else(|| Value::Object(Default::default()));

    // Gate completion on the stage requirement policy before mutating.
    let current = state
        .manager
        .get_session(&params.session_id)
        .await
        .map_err(execution_error)?;
    if let Some(current) = current {
        let mut candidate = current
            .stage_progress(stage)
            .map(|p| p.data.clone())
            .unwrap_or_else(|| Value::Object(Default::default()));
        if let (Some(target), Some(patch)) = (candidate.as_object_mut(), final_data.as_object()) {
            for (key, value) in patch {
                target.insert(key.clone(), value.clone());
            }
        }
        let validation = state.manager.validate_stage_completion(stage, &candidate);
        if !validation.valid {
            return Err(McpError::ExecutionFailed {
                message: format!(
                    "validation-error: stage {} incomplete (score {}, missing: {})",
                    stage,
                    validation.score,
                    validation.missing_fields.join(", ")
                ),
            });
        }
    }

    let advance = state
        .manager
        .complete_stage(
            &params.session_id,
            stage,
            final_data,
            params.completion_score,
        )
        .await
        .map_err(execution_error)?;

    Ok(json!({
        "session": advance.session,
        "next_stage": advance.next_stage,
    }))
}

async fn handle_validate_stage(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct ValidateParams {
        stage: String,
        data: Value,
    }

    let params: ValidateParams = parse_arguments("discovery_validate_stage", arguments)?;
    let stage = parse_stage(&params.stage)?;

    let validation = state.manager.validate_stage_completion(stage, &params.data);
    serde_json::to_value(validation).map_err(McpError::Json)
}

async fn handle_research_run(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct ResearchParams {
        session_id: String,
        provider: String,
        query_type: String,
        query: String,
        #[serde(default)]
        technologies: Vec<String>,
        #[serde(default)]
        stage: Option<String>,
    }

    let params: ResearchParams = parse_arguments("research_run", arguments)?;
    let query_type: QueryType =
        params
            .query_type
            .parse()
            .map_err(|e: String| McpError::InvalidParameters {
                tool_name: "research_run".to_string(),
                message: e,
            })?;

    let mut context = ProviderContext::default().with_technologies(params.technologies);
    if let Some(stage) = &params.stage {
        context.stage = Some(parse_stage(stage)?);
    }

    let session = state
        .aggregator
        .run_query(
            &params.session_id,
            &params.provider,
            query_type,
            &params.query,
            &context,
        )
        .await
        .map_err(execution_error)?;

    Ok(json!({
        "session_id": session.id,
        "bucket": query_type.bucket(),
        "research_queries": session.research_data.total_queries(),
    }))
}

async fn handle_prd_generate(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct GenerateParams {
        session_id: String,
        #[serde(default)]
        template_type: Option<String>,
        #[serde(default)]
        include_research_data: bool,
        #[serde(default)]
        output_path: Option<String>,
    }

    let params: GenerateParams = parse_arguments("prd_generate", arguments)?;
    let template_type = match &params.template_type {
        Some(raw) => raw
            .parse::<TemplateType>()
            .map_err(|e| McpError::InvalidParameters {
                tool_name: "prd_generate".to_string(),
                message: e,
            })?,
        None => TemplateType::default(),
    };

    let session = state
        .manager
        .get_session(&params.session_id)
        .await
        .map_err(execution_error)?
        .ok_or_else(|| {
            execution_error(
                crate::error::SessionError::NotFound {
                    session_id: params.session_id.clone(),
                }
                .into(),
            )
        })?;

    let options = PrdOptions {
        template_type,
        include_research_data: params.include_research_data,
        output_path: params.output_path.clone(),
    };

    let prd = match state.generator.generate(&session, &options).await {
        Ok(prd) => prd,
        Err(e) => {
            // Contract shape: failures come back as a structured result.
            return Ok(json!({
                "success": false,
                "error": { "code": e.code(), "message": e.to_string() },
            }));
        }
    };

    if let Some(path) = &params.output_path {
        tokio::fs::write(path, prd.content.as_bytes())
            .await
            .map_err(|e| McpError::ExecutionFailed {
                message: format!("failed to write {}: {}", path, e),
            })?;
    }

    // Record the outcome in the prd-generation stage; scores are written
    // back as metadata but never re-open a completed stage.
    let snapshot = serde_json::to_value(&prd.quality).map_err(McpError::Json)?;
    state
        .manager
        .update_session_stage(
            &params.session_id,
            Stage::PrdGeneration,
            json!({
                "generated_content": prd.content,
                "quality_snapshot": snapshot,
                "output_path": params.output_path.clone().unwrap_or_default(),
                "generated_at": Utc::now(),
            }),
        )
        .await
        .map_err(execution_error)?;

    Ok(json!({
        "success": true,
        "prd": {
            "content": prd.content,
            "structure": prd.structure,
        },
        "quality": prd.quality,
    }))
}

async fn handle_prd_assess(state: &SharedState, arguments: Option<Value>) -> McpResult<Value> {
    #[derive(serde::Deserialize)]
    struct AssessParams {
        session_id: String,
        document: String,
        #[serde(default)]
        sections: Vec<String>,
    }

    let params: AssessParams = parse_arguments("prd_assess", arguments)?;
    let session = state
        .manager
        .get_session(&params.session_id)
        .await
        .map_err(execution_error)?
        .ok_or_else(|| {
            execution_error(
                crate::error::SessionError::NotFound {
                    session_id: params.session_id.clone(),
                }
                .into(),
            )
        })?;

    let hints = if params.sections.is_empty() {
        None
    } else {
        Some(StructureHints {
            sections: params.sections,
        })
    };

    let assessment = state.quality.assess(&params.document, &session, hints.as_ref());
    serde_json::to_value(assessment).map_err(McpError::Json)
}
