//! Unit tests for JSON-RPC structures and tool definitions.

use super::*;

#[test]
fn test_json_rpc_success_response() {
    let response = JsonRpcResponse::success(Some(json!(1)), json!({ "ok": true }));
    let encoded = serde_json::to_value(&response).unwrap();

    assert_eq!(encoded["jsonrpc"], "2.0");
    assert_eq!(encoded["id"], 1);
    assert_eq!(encoded["result"]["ok"], true);
    assert!(encoded.get("error").is_none());
}

#[test]
fn test_json_rpc_error_response() {
    let response = JsonRpcResponse::error(Some(json!("req-7")), -32601, "Method not found");
    let encoded = serde_json::to_value(&response).unwrap();

    assert_eq!(encoded["id"], "req-7");
    assert_eq!(encoded["error"]["code"], -32601);
    assert_eq!(encoded["error"]["message"], "Method not found");
    assert!(encoded.get("result").is_none());
}

#[test]
fn test_json_rpc_null_id_for_notifications() {
    let response = JsonRpcResponse::error(None, -32700, "Parse error");
    let encoded = serde_json::to_value(&response).unwrap();
    assert_eq!(encoded["id"], Value::Null);
}

#[test]
fn test_request_parsing() {
    let raw = r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"discovery_status"}}"#;
    let request: JsonRpcRequest = serde_json::from_str(raw).unwrap();

    assert_eq!(request.method, "tools/call");
    assert_eq!(request.id, Some(json!(3)));
    assert!(request.params.is_some());
}

#[test]
fn test_notification_has_no_id() {
    let raw = r#"{"jsonrpc":"2.0","method":"initialized"}"#;
    let request: JsonRpcRequest = serde_json::from_str(raw).unwrap();
    assert!(request.id.is_none());
}

#[test]
fn test_tool_definitions_cover_discovery_surface() {
    let tools = tool_definitions();
    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();

    for expected in [
        "discovery_start",
        "discovery_resume",
        "discovery_status",
        "discovery_cancel",
        "discovery_update_stage",
        "discovery_complete_stage",
        "discovery_validate_stage",
        "research_run",
        "prd_generate",
        "prd_assess",
    ] {
        assert!(names.contains(&expected), "missing tool {}", expected);
    }
}

#[test]
fn test_tool_schemas_are_objects() {
    for tool in tool_definitions() {
        assert_eq!(
            tool.input_schema["type"], "object",
            "tool {} schema must be an object",
            tool.name
        );
        assert!(!tool.description.is_empty());
    }
}

#[test]
fn test_stage_schema_lists_canonical_stages() {
    let schema = stage_schema();
    let stages = schema["enum"].as_array().unwrap();
    assert_eq!(stages.len(), 5);
    assert_eq!(stages[0], "problem-framing");
    assert_eq!(stages[4], "prd-generation");
}
