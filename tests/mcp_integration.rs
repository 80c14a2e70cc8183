//! Integration tests for MCP protocol handling.
//!
//! These tests drive a fully registered server through the in-memory
//! transport, one JSON line at a time, and inspect what it writes back.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};

use mcp_stdio_server::builtin::{self, About};
use mcp_stdio_server::error::TransportError;
use mcp_stdio_server::mcp::protocol::{parse_message, Message, RequestId};
use mcp_stdio_server::mcp::server::McpServer;
use mcp_stdio_server::mcp::transport::MemoryTransport;

fn server() -> McpServer<MemoryTransport> {
    let mut server = McpServer::with_identity(MemoryTransport::new(), "test-server", "9.9.9");
    server.instructions("Use the tools.");
    builtin::register_all(&mut server, About::new("test-server", "9.9.9", "Use the tools."))
        .unwrap();
    server
}

/// Sends one line and returns every line written in response, parsed.
fn exchange(server: &mut McpServer<MemoryTransport>, line: &str) -> Vec<Value> {
    server.handle_line(line);
    server
        .transport_mut()
        .take_written()
        .iter()
        .map(|out| serde_json::from_str(out).unwrap())
        .collect()
}

fn request(server: &mut McpServer<MemoryTransport>, id: i64, method: &str, params: Value) -> Value {
    let line = json!({"jsonrpc": "2.0", "id": id, "method": method, "params": params}).to_string();
    let mut out = exchange(server, &line);
    assert_eq!(out.len(), 1, "expected exactly one response to {method}");
    out.remove(0)
}

fn initialize(server: &mut McpServer<MemoryTransport>) -> Value {
    request(
        server,
        0,
        "initialize",
        json!({
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {"name": "test-client", "version": "1.0.0"}
        }),
    )
}

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    match parse_message(json).unwrap() {
        Message::Request(req) => {
            assert_eq!(req.method(), "initialize");
            assert_eq!(req.id(), &RequestId::Number(1));
        }
        other => panic!("Expected Request, got {other:?}"),
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#;

    match parse_message(json).unwrap() {
        Message::Notification(n) => assert_eq!(n.method(), "notifications/initialized"),
        other => panic!("Expected Notification, got {other:?}"),
    }
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{"id": 1, "method": "test"}"#;
    assert!(parse_message(json).is_err());
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_initialize_reports_identity_and_capabilities() {
    let mut server = server();
    let response = initialize(&mut server);

    assert_eq!(response["id"], 0);
    let result = &response["result"];
    assert_eq!(result["protocolVersion"], "2024-11-05");
    assert_eq!(result["serverInfo"], json!({"name": "test-server", "version": "9.9.9"}));
    assert_eq!(result["instructions"], "Use the tools.");
    assert_eq!(result["capabilities"]["tools"], json!({"listChanged": false}));
    assert_eq!(result["capabilities"]["prompts"], json!({"listChanged": false}));
    assert_eq!(
        result["capabilities"]["resources"],
        json!({"listChanged": false, "subscribe": false})
    );
    assert_eq!(result["capabilities"]["logging"], json!({}));
}

#[test]
fn test_requests_before_initialize_are_rejected() {
    let mut server = server();

    let response = request(&mut server, 1, "tools/list", json!({}));
    assert_eq!(response["error"]["code"], -32600);
    assert_eq!(
        response["error"]["message"],
        "Server not initialized. Call initialize first."
    );

    let pong = request(&mut server, 2, "ping", json!({}));
    assert_eq!(pong["result"], json!({}));
}

#[test]
fn test_notifications_get_no_response() {
    let mut server = server();
    initialize(&mut server);

    let out = exchange(
        &mut server,
        r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#,
    );
    assert!(out.is_empty());
}

#[test]
fn test_malformed_line_gets_null_id_parse_error() {
    let mut server = server();
    let out = exchange(&mut server, "{ not json");

    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["id"], Value::Null);
    assert_eq!(out[0]["error"]["code"], -32700);
}

#[test]
fn test_unknown_method() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 5, "sampling/createMessage", json!({}));
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(
        response["error"]["message"],
        "Method not found: sampling/createMessage"
    );
}

// =============================================================================
// Tool Tests
// =============================================================================

#[test]
fn test_tools_list_in_registration_order() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 1, "tools/list", json!({}));
    let names: Vec<&str> = response["result"]["tools"]
        .as_array()
        .unwrap()
        .iter()
        .map(|tool| tool["name"].as_str().unwrap())
        .collect();

    assert_eq!(
        names,
        ["get_current_date_and_time", "remember_value", "recall_value"]
    );
    assert_eq!(
        response["result"]["tools"][0]["annotations"]["title"],
        "Get Current Date and Time"
    );
}

#[test]
fn test_unknown_tool_is_method_not_found() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 1, "tools/call", json!({"name": "nope"}));
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Unknown tool: nope");
}

#[test]
fn test_tool_failure_is_a_successful_error_result() {
    let mut server = server();
    initialize(&mut server);

    let response = request(
        &mut server,
        1,
        "tools/call",
        json!({"name": "recall_value", "arguments": {"key": "never-set"}}),
    );

    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    assert_eq!(response["result"]["content"][0]["type"], "text");
    assert!(response["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .starts_with("Error executing tool: "));
}

#[test]
fn test_cache_survives_between_tool_calls() {
    let mut server = server();
    initialize(&mut server);

    request(
        &mut server,
        1,
        "tools/call",
        json!({"name": "remember_value", "arguments": {"key": "colour", "value": "teal"}}),
    );
    let response = request(
        &mut server,
        2,
        "tools/call",
        json!({"name": "recall_value", "arguments": {"key": "colour"}}),
    );

    assert_eq!(response["result"]["isError"], false);
    assert_eq!(response["result"]["content"][0]["text"], "\"teal\"");
}

#[test]
fn test_tools_call_rejects_non_object_arguments() {
    let mut server = server();
    initialize(&mut server);

    let response = request(
        &mut server,
        1,
        "tools/call",
        json!({"name": "recall_value", "arguments": "colour"}),
    );
    assert_eq!(response["error"]["code"], -32602);
}

// =============================================================================
// Prompt Tests
// =============================================================================

#[test]
fn test_prompts_get_renders_user_message() {
    let mut server = server();
    initialize(&mut server);

    let response = request(
        &mut server,
        1,
        "prompts/get",
        json!({"name": "pair_programmer", "arguments": {"focus": "tests"}}),
    );

    let result = &response["result"];
    assert_eq!(result["description"], "Set up the assistant as a pair programmer");
    assert_eq!(result["messages"][0]["role"], "user");
    assert_eq!(result["messages"][0]["content"]["type"], "text");
    assert!(result["messages"][0]["content"]["text"]
        .as_str()
        .unwrap()
        .ends_with("Focus on: tests."));
}

#[test]
fn test_prompts_get_unknown_prompt() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 1, "prompts/get", json!({"name": "missing"}));
    assert_eq!(response["error"]["code"], -32002);
    assert_eq!(response["error"]["message"], "Prompt not found: missing");
}

#[test]
fn test_prompts_list_includes_arguments() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 1, "prompts/list", json!({}));
    let prompt = &response["result"]["prompts"][0];
    assert_eq!(prompt["name"], "pair_programmer");
    assert_eq!(prompt["arguments"][0]["name"], "focus");
    assert_eq!(prompt["arguments"][0]["required"], false);
}

// =============================================================================
// Resource Tests
// =============================================================================

#[test]
fn test_read_static_resource() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 1, "resources/read", json!({"uri": "server://about"}));
    let contents = &response["result"]["contents"][0];
    assert_eq!(contents["uri"], "server://about");
    assert_eq!(contents["mimeType"], "application/json");

    let about: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
    assert_eq!(about["name"], "test-server");
    assert_eq!(about["version"], "9.9.9");
}

#[test]
fn test_read_resource_through_template() {
    let mut server = server();
    initialize(&mut server);

    let Ok(path) = std::env::var("PATH") else {
        return;
    };

    let response = request(&mut server, 1, "resources/read", json!({"uri": "env://PATH"}));
    let contents = &response["result"]["contents"][0];
    assert_eq!(contents["uri"], "env://PATH");
    assert_eq!(contents["text"], path);
}

#[test]
fn test_read_unknown_resource() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 1, "resources/read", json!({"uri": "file:///nowhere"}));
    assert_eq!(response["error"]["code"], -32002);
    assert_eq!(response["error"]["message"], "Resource not found: file:///nowhere");

    let response = request(&mut server, 2, "resources/read", json!({}));
    assert_eq!(response["error"]["code"], -32602);
}

#[test]
fn test_templates_list() {
    let mut server = server();
    initialize(&mut server);

    let response = request(&mut server, 1, "resources/templates/list", json!({}));
    let template = &response["result"]["resourceTemplates"][0];
    assert_eq!(template["uriTemplate"], "env://{name}");
    assert_eq!(template["name"], "environment-variable");
}

// =============================================================================
// Keepalive Tests
// =============================================================================

#[test]
fn test_keepalive_ping_then_timeout() {
    let failures = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&failures);

    let mut server = server();
    server.configure_ping(
        true,
        Duration::ZERO,
        Duration::ZERO,
        Some(Box::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })),
    );

    // No pings before the session is initialised.
    assert!(!server.tick().unwrap());
    assert!(server.transport_mut().take_written().is_empty());

    initialize(&mut server);

    assert!(!server.tick().unwrap());
    let written = server.transport_mut().take_written();
    assert_eq!(written.len(), 1);
    let ping: Value = serde_json::from_str(&written[0]).unwrap();
    assert_eq!(ping["method"], "ping");
    assert!(ping["id"].as_str().unwrap().starts_with("ping-"));
    assert!(server.pending_ping_id().is_some());

    // The tick that times out the ping does not send another.
    assert!(!server.tick().unwrap());
    assert_eq!(failures.load(Ordering::SeqCst), 1);
    assert!(server.pending_ping_id().is_none());
    assert!(server.transport_mut().take_written().is_empty());
}

#[test]
fn test_keepalive_pong_clears_pending() {
    let mut server = server();
    server.configure_ping(true, Duration::ZERO, Duration::from_secs(3600), None);
    initialize(&mut server);

    assert!(!server.tick().unwrap());
    let written = server.transport_mut().take_written();
    let ping: Value = serde_json::from_str(&written[0]).unwrap();

    let pong = json!({"jsonrpc": "2.0", "id": ping["id"], "result": {}}).to_string();
    assert!(exchange(&mut server, &pong).is_empty());
    assert!(server.pending_ping_id().is_none());
}

// =============================================================================
// Poll Loop Tests
// =============================================================================

#[test]
fn test_tick_reports_closed_input() {
    let mut server = McpServer::new(MemoryTransport::with_lines(["", "   "]));
    assert!(matches!(server.tick(), Err(TransportError::Closed)));
}

#[tokio::test]
async fn test_run_until_input_closes() {
    let lines = [
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {"capabilities": {}}})
            .to_string(),
        json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string(),
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}).to_string(),
    ];

    let mut server = McpServer::new(MemoryTransport::with_lines(lines));
    builtin::register_all(&mut server, About::new("mcp-stdio-server", "0.1.0", "")).unwrap();

    server.run().await.unwrap();

    let written = server.transport().written();
    assert_eq!(written.len(), 2);

    let init: Value = serde_json::from_str(&written[0]).unwrap();
    assert_eq!(init["result"]["protocolVersion"], "2024-11-05");

    let list: Value = serde_json::from_str(&written[1]).unwrap();
    assert_eq!(list["id"], 2);
    assert_eq!(list["result"]["tools"].as_array().unwrap().len(), 3);
}
