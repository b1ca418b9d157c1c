//! MCP protocol implementation for JSON-RPC 2.0 communication.
//!
//! This module provides the core MCP server implementation including:
//! - JSON-RPC 2.0 request/response handling
//! - Tool definitions and schemas
//! - Stdio-based server communication

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, error, info};

use super::{handle_tool_call, SharedState};

#[cfg(test)]
#[path = "mcp_tests.rs"]
mod mcp_tests;

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Deserialize)]
pub struct JsonRpcRequest {
    /// JSON-RPC version (must be "2.0").
    pub jsonrpc: String,
    /// Request identifier (None for notifications).
    pub id: Option<Value>,
    /// The method name to invoke.
    pub method: String,
    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Serialize)]
pub struct JsonRpcResponse {
    /// JSON-RPC version (always "2.0").
    pub jsonrpc: String,
    /// Request identifier (null if notification, must always be present per spec).
    pub id: Value,
    /// The result on success (mutually exclusive with error).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// The error on failure (mutually exclusive with result).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC 2.0 error object.
#[derive(Debug, Serialize)]
pub struct JsonRpcError {
    /// Error code (negative for predefined errors).
    pub code: i32,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional error data.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

/// MCP server information returned during initialization.
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// The server name identifier.
    pub name: String,
    /// The server version string.
    pub version: String,
}

/// MCP server capabilities advertised to clients.
#[derive(Debug, Serialize)]
pub struct Capabilities {
    /// Tool-related capabilities.
    pub tools: ToolCapabilities,
}

/// Tool-specific capabilities.
#[derive(Debug, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change dynamically.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Result of the MCP initialize handshake.
#[derive(Debug, Serialize)]
pub struct InitializeResult {
    /// The MCP protocol version supported.
    #[serde(rename = "protocolVersion")]
    pub protocol_version: String,
    /// Server capabilities.
    pub capabilities: Capabilities,
    /// Server identification information.
    #[serde(rename = "serverInfo")]
    pub server_info: ServerInfo,
}

/// MCP tool definition with JSON Schema.
#[derive(Debug, Clone, Serialize)]
pub struct Tool {
    /// Unique tool name (used in tool calls).
    pub name: String,
    /// Human-readable description of the tool.
    pub description: String,
    /// JSON Schema for the tool's input parameters.
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// Parameters for a tools/call request.
#[derive(Debug, Deserialize)]
pub struct ToolCallParams {
    /// The name of the tool to invoke.
    pub name: String,
    /// Optional arguments for the tool.
    #[serde(default)]
    pub arguments: Option<Value>,
}

/// Content item within a tool result.
#[derive(Debug, Serialize)]
pub struct ToolResultContent {
    /// The content type (e.g., "text").
    #[serde(rename = "type")]
    pub content_type: String,
    /// The text content of the result.
    pub text: String,
}

/// Result of a tool invocation.
#[derive(Debug, Serialize)]
pub struct ToolCallResult {
    /// The result content items.
    pub content: Vec<ToolResultContent>,
    /// Whether the result represents an error.
    #[serde(rename = "isError", skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

impl JsonRpcResponse {
    /// Create a success response
    pub fn success(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: Some(result),
            error: None,
        }
    }

    /// Create an error response
    pub fn error(id: Option<Value>, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id: id.unwrap_or(Value::Null),
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}

/// MCP Server running over stdio.
///
/// Handles JSON-RPC 2.0 messages over stdin/stdout for MCP protocol
/// communication with clients.
pub struct McpServer {
    /// Shared application state.
    state: SharedState,
}

impl McpServer {
    /// Create a new MCP server
    pub fn new(state: SharedState) -> Self {
        Self { state }
    }

    /// Run the server using async stdio
    pub async fn run(&self) -> std::io::Result<()> {
        info!("MCP Discovery Workflow Server starting...");

        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        loop {
            line.clear();
            let bytes_read = reader.read_line(&mut line).await?;

            // EOF reached
            if bytes_read == 0 {
                info!("EOF received, shutting down");
                break;
            }

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            debug!(request = %trimmed, "Received request");

            let response = match serde_json::from_str::<JsonRpcRequest>(trimmed) {
                Ok(request) => self.handle_request(request).await,
                Err(e) => {
                    error!(error = %e, "Failed to parse request");
                    Some(JsonRpcResponse::error(
                        None,
                        -32700,
                        format!("Parse error: {}", e),
                    ))
                }
            };

            // Only send response if not a notification (per JSON-RPC 2.0 spec)
            if let Some(response) = response {
                let response_json = serde_json::to_string(&response)?;
                debug!(response = %response_json, "Sending response");

                stdout.write_all(response_json.as_bytes()).await?;
                stdout.write_all(b"\n").await?;
                stdout.flush().await?;
            }
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request
    /// Returns None for notifications (requests without id) per JSON-RPC 2.0 spec
    async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        let is_notification = request.id.is_none();

        match request.method.as_str() {
            "initialize" => Some(self.handle_initialize(request.id)),
            "initialized" => {
                debug!("Received initialized notification");
                None
            }
            "notifications/cancelled" => {
                debug!("Received cancelled notification");
                None
            }
            "tools/list" => Some(self.handle_tools_list(request.id)),
            "tools/call" => Some(self.handle_tool_call(request.id, request.params).await),
            "ping" => Some(JsonRpcResponse::success(
                request.id,
                Value::Object(Default::default()),
            )),
            method => {
                if is_notification {
                    debug!(method = %method, "Unknown notification, ignoring");
                    None
                } else {
                    error!(method = %method, "Unknown method");
                    Some(JsonRpcResponse::error(
                        request.id,
                        -32601,
                        format!("Method not found: {}", method),
                    ))
                }
            }
        }
    }

    /// Handle initialize request
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling initialize request");

        let result = InitializeResult {
            protocol_version: "2024-11-05".to_string(),
            capabilities: Capabilities {
                tools: ToolCapabilities {
                    list_changed: false,
                },
            },
            server_info: ServerInfo {
                name: "mcp-discovery-workflow".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => {
                error!(error = %e, "Failed to serialize initialize result");
                JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e))
            }
        }
    }

    /// Handle tools/list request
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        info!("Handling tools/list request");

        let tools = tool_definitions();

        JsonRpcResponse::success(
            id,
            json!({
                "tools": tools
            }),
        )
    }

    /// Handle tools/call request
    async fn handle_tool_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(p) => p,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, format!("Invalid params: {}", e));
                }
            },
            None => {
                return JsonRpcResponse::error(id, -32602, "Missing params");
            }
        };

        info!(tool = %params.name, "Handling tool call");

        let (content, is_error) =
            match handle_tool_call(&self.state, &params.name, params.arguments).await {
                Ok(result) => {
                    let text = serde_json::to_string_pretty(&result).unwrap_or_else(|e| {
                        error!(error = %e, "Failed to serialize tool result");
                        format!("{{\"error\": \"Serialization failed: {}\"}}", e)
                    });
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text,
                        },
                        None,
                    )
                }
                Err(e) => {
                    error!(tool = %params.name, error = %e, "Tool call failed");
                    (
                        ToolResultContent {
                            content_type: "text".to_string(),
                            text: e.to_string(),
                        },
                        Some(true),
                    )
                }
            };

        let result = ToolCallResult {
            content: vec![content],
            is_error,
        };

        match serde_json::to_value(result) {
            Ok(val) => JsonRpcResponse::success(id, val),
            Err(e) => JsonRpcResponse::error(id, -32603, format!("Internal error: {}", e)),
        }
    }
}

/// All tool definitions advertised by this server.
pub fn tool_definitions() -> Vec<Tool> {
    vec![
        get_start_tool(),
        get_resume_tool(),
        get_status_tool(),
        get_cancel_tool(),
        get_update_stage_tool(),
        get_complete_stage_tool(),
        get_validate_stage_tool(),
        get_research_run_tool(),
        get_prd_generate_tool(),
        get_prd_assess_tool(),
    ]
}

fn stage_schema() -> Value {
    json!({
        "type": "string",
        "enum": [
            "problem-framing",
            "market-research",
            "technical-feasibility",
            "requirements-synthesis",
            "prd-generation"
        ],
        "description": "One of the five canonical discovery stages"
    })
}

fn get_start_tool() -> Tool {
    Tool {
        name: "discovery_start".to_string(),
        description: "Start a new discovery session for a project. Fails if an active session already exists.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "project_name": { "type": "string", "description": "Project identifier" },
                "preferences": { "type": "object", "description": "Free-form user preferences" },
                "tech_stack_hints": { "type": "array", "items": { "type": "string" } },
                "constraints": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["project_name"]
        }),
    }
}

fn get_resume_tool() -> Tool {
    Tool {
        name: "discovery_resume".to_string(),
        description: "Resume an existing discovery session by id.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" }
            },
            "required": ["session_id"]
        }),
    }
}

fn get_status_tool() -> Tool {
    Tool {
        name: "discovery_status".to_string(),
        description: "Summarize the current discovery session and per-stage progress.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

fn get_cancel_tool() -> Tool {
    Tool {
        name: "discovery_cancel".to_string(),
        description: "Cancel a discovery session. Terminal; a new session can then be started.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" }
            },
            "required": ["session_id"]
        }),
    }
}

fn get_update_stage_tool() -> Tool {
    Tool {
        name: "discovery_update_stage".to_string(),
        description: "Merge partial data into a stage's payload and make that stage current.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "stage": stage_schema(),
                "data": { "type": "object", "description": "Partial stage payload, shallow-merged" }
            },
            "required": ["session_id", "stage", "data"]
        }),
    }
}

fn get_complete_stage_tool() -> Tool {
    Tool {
        name: "discovery_complete_stage".to_string(),
        description: "Complete a stage and advance to its successor. Gated on the stage requirement policy.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "stage": stage_schema(),
                "data": { "type": "object", "description": "Final stage payload, shallow-merged" },
                "completion_score": { "type": "integer", "minimum": 0, "maximum": 100 }
            },
            "required": ["session_id", "stage"]
        }),
    }
}

fn get_validate_stage_tool() -> Tool {
    Tool {
        name: "discovery_validate_stage".to_string(),
        description: "Score stage data against the stage's required fields without mutating anything.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "stage": stage_schema(),
                "data": { "type": "object" }
            },
            "required": ["stage", "data"]
        }),
    }
}

fn get_research_run_tool() -> Tool {
    Tool {
        name: "research_run".to_string(),
        description: "Run one research query through a provider adapter and record the outcome in the matching session bucket.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "provider": { "type": "string", "description": "Provider name; unknown names fail softly" },
                "query_type": {
                    "type": "string",
                    "enum": ["market-analysis", "technical-validation", "competitive-analysis", "general"]
                },
                "query": { "type": "string" },
                "technologies": { "type": "array", "items": { "type": "string" } },
                "stage": stage_schema()
            },
            "required": ["session_id", "provider", "query_type", "query"]
        }),
    }
}

fn get_prd_generate_tool() -> Tool {
    Tool {
        name: "prd_generate".to_string(),
        description: "Generate the PRD from a session with completed requirements synthesis, score it, and record the outcome.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "template_type": { "type": "string", "enum": ["standard", "lean", "technical"] },
                "include_research_data": { "type": "boolean" },
                "output_path": { "type": "string" }
            },
            "required": ["session_id"]
        }),
    }
}

fn get_prd_assess_tool() -> Tool {
    Tool {
        name: "prd_assess".to_string(),
        description: "Assess a document's quality against the session's discovery data.".to_string(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "session_id": { "type": "string" },
                "document": { "type": "string" },
                "sections": { "type": "array", "items": { "type": "string" } }
            },
            "required": ["session_id", "document"]
        }),
    }
}
