//! Capabilities registered by the `mcp-stdio-server` binary.
//!
//! Registration is an explicit manifest: [`register_all`] constructs every
//! built-in tool, prompt, resource and template and hands each to the
//! server builder. Adding a capability means adding it here.

use chrono::{SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use crate::error::{HandlerError, ProtocolError, RegistryError};
use crate::feature::{
    Prompt, Resource, ResourceTemplate, Tool, ToolAnnotations, ToolContext, ToolResponse,
    UriParams,
};
use crate::mcp::server::McpServer;
use crate::mcp::transport::Transport;

/// Registers every built-in capability on `server`.
///
/// # Errors
///
/// Returns an error if a built-in collides with an already registered item.
pub fn register_all<T: Transport>(server: &mut McpServer<T>, about: About) -> Result<(), RegistryError> {
    for tool in tools() {
        server.tool(tool)?;
    }
    for prompt in prompts() {
        server.prompt(prompt)?;
    }
    server.resource(Box::new(about))?;
    server.resource_template(Box::new(EnvVarTemplate))?;
    Ok(())
}

/// Built-in tools, in listing order.
#[must_use]
pub fn tools() -> Vec<Box<dyn Tool>> {
    vec![
        Box::new(CurrentDateTime),
        Box::new(RememberValue),
        Box::new(RecallValue),
    ]
}

/// Built-in prompts, in listing order.
#[must_use]
pub fn prompts() -> Vec<Box<dyn Prompt>> {
    vec![Box::new(PairProgrammer)]
}

/// `get_current_date_and_time`: the current UTC date and time.
pub struct CurrentDateTime;

impl Tool for CurrentDateTime {
    fn name(&self) -> &str {
        "get_current_date_and_time"
    }

    fn description(&self) -> &str {
        "Get the current date and time"
    }

    fn input_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::new()
            .title("Get Current Date and Time")
            .read_only(true)
            .destructive(false)
            .idempotent(true)
            .open_world(false)
    }

    fn handle(
        &self,
        _arguments: &Map<String, Value>,
        _ctx: &mut ToolContext<'_>,
    ) -> Result<ToolResponse, HandlerError> {
        let now = Utc::now();
        Ok(ToolResponse::json(&json!({
            "date": now.format("%Y-%m-%d").to_string(),
            "time": now.format("%H:%M:%S").to_string(),
            "timezone": "UTC",
            "iso8601": now.to_rfc3339_opts(SecondsFormat::Secs, true),
        })))
    }
}

fn required_key(arguments: &Map<String, Value>) -> Result<&str, HandlerError> {
    arguments
        .get("key")
        .and_then(Value::as_str)
        .filter(|key| !key.is_empty())
        .ok_or_else(|| HandlerError::msg("'key' must be a non-empty string"))
}

/// `remember_value`: stores a JSON value in the session cache.
pub struct RememberValue;

impl Tool for RememberValue {
    fn name(&self) -> &str {
        "remember_value"
    }

    fn description(&self) -> &str {
        "Store a value under a key for later calls in this session"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {"type": "string", "description": "Name to store the value under"},
                "value": {"description": "Any JSON value"}
            },
            "required": ["key", "value"]
        })
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::new()
            .title("Remember Value")
            .destructive(false)
            .idempotent(true)
            .open_world(false)
    }

    fn handle(
        &self,
        arguments: &Map<String, Value>,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolResponse, HandlerError> {
        let key = required_key(arguments)?;
        let value = arguments
            .get("value")
            .ok_or_else(|| HandlerError::msg("'value' is required"))?;

        let replaced = ctx.cache().has(key);
        ctx.cache().set(key, value.clone());

        Ok(ToolResponse::json(&json!({"key": key, "replaced": replaced})))
    }
}

/// `recall_value`: reads a value stored by `remember_value`.
pub struct RecallValue;

impl Tool for RecallValue {
    fn name(&self) -> &str {
        "recall_value"
    }

    fn description(&self) -> &str {
        "Read a value stored earlier with remember_value"
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "key": {"type": "string", "description": "Name the value was stored under"}
            },
            "required": ["key"]
        })
    }

    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::new()
            .title("Recall Value")
            .read_only(true)
            .destructive(false)
            .idempotent(true)
            .open_world(false)
    }

    fn handle(
        &self,
        arguments: &Map<String, Value>,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolResponse, HandlerError> {
        let key = required_key(arguments)?;
        match ctx.cache().get(key) {
            Some(value) => Ok(ToolResponse::json(value)),
            None => Err(HandlerError::msg(format!("Nothing remembered under '{key}'"))),
        }
    }
}

/// `pair_programmer`: frames the assistant as a pair programmer.
pub struct PairProgrammer;

impl Prompt for PairProgrammer {
    fn name(&self) -> &str {
        "pair_programmer"
    }

    fn description(&self) -> &str {
        "Set up the assistant as a pair programmer"
    }

    fn argument_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "focus": {
                    "type": "string",
                    "description": "What the session should concentrate on"
                }
            },
            "required": []
        })
    }

    fn message(&self, arguments: &Map<String, Value>) -> Result<String, HandlerError> {
        let mut message = String::from(
            "You are an expert developer pairing with the user. Prefer clean, simple, \
             self-documenting code and explain trade-offs briefly.",
        );

        match arguments.get("focus") {
            None | Some(Value::Null) => {}
            Some(Value::String(focus)) if !focus.trim().is_empty() => {
                message.push_str(" Focus on: ");
                message.push_str(focus.trim());
                message.push('.');
            }
            Some(Value::String(_)) => {}
            Some(_) => return Err(ProtocolError::invalid_params("'focus' must be a string").into()),
        }

        Ok(message)
    }
}

/// `server://about`: server identity as JSON.
pub struct About {
    name: String,
    version: String,
    instructions: String,
}

impl About {
    /// Describes a server with the given identity.
    #[must_use]
    pub fn new(name: impl Into<String>, version: impl Into<String>, instructions: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            instructions: instructions.into(),
        }
    }
}

impl Resource for About {
    fn uri(&self) -> &str {
        "server://about"
    }

    fn description(&self) -> Option<&str> {
        Some("Server name, version and instructions")
    }

    fn mime_type(&self) -> Option<&str> {
        Some("application/json")
    }

    fn content(&self) -> Result<String, HandlerError> {
        Ok(serde_json::to_string(&json!({
            "name": self.name,
            "version": self.version,
            "instructions": self.instructions,
        }))?)
    }
}

/// `env://{name}`: the value of one environment variable.
pub struct EnvVarTemplate;

impl ResourceTemplate for EnvVarTemplate {
    fn uri_template(&self) -> &str {
        "env://{name}"
    }

    fn name(&self) -> &str {
        "environment-variable"
    }

    fn description(&self) -> Option<&str> {
        Some("Value of an environment variable of the server process")
    }

    fn mime_type(&self) -> Option<&str> {
        Some("text/plain")
    }

    fn create_resource(
        &self,
        uri: &str,
        params: &UriParams,
    ) -> Result<Box<dyn Resource>, HandlerError> {
        let name = params
            .get("name")
            .ok_or_else(|| HandlerError::msg("missing 'name' parameter"))?;

        match std::env::var(name) {
            Ok(value) => Ok(Box::new(EnvVar {
                uri: uri.to_string(),
                value,
            })),
            Err(_) => Err(ProtocolError::resource_not_found(format!("Resource not found: {uri}")).into()),
        }
    }
}

struct EnvVar {
    uri: String,
    value: String,
}

impl Resource for EnvVar {
    fn uri(&self) -> &str {
        &self.uri
    }

    fn mime_type(&self) -> Option<&str> {
        Some("text/plain")
    }

    fn content(&self) -> Result<String, HandlerError> {
        Ok(self.value.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::Cache;

    fn args(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    fn text(response: &ToolResponse) -> Value {
        let value = serde_json::to_value(response).unwrap();
        serde_json::from_str(value["content"][0]["text"].as_str().unwrap()).unwrap()
    }

    #[test]
    fn date_time_is_utc() {
        let mut cache = Cache::default();
        let response = CurrentDateTime
            .handle(&Map::new(), &mut ToolContext::new(&mut cache))
            .unwrap();

        let value = text(&response);
        assert_eq!(value["timezone"], "UTC");
        assert_eq!(value["date"].as_str().unwrap().len(), 10);
        assert!(value["iso8601"].as_str().unwrap().ends_with('Z'));
    }

    #[test]
    fn remember_then_recall() {
        let mut cache = Cache::default();
        let mut ctx = ToolContext::new(&mut cache);

        let stored = RememberValue
            .handle(&args(json!({"key": "k", "value": [1, 2]})), &mut ctx)
            .unwrap();
        assert_eq!(text(&stored), json!({"key": "k", "replaced": false}));

        let recalled = RecallValue.handle(&args(json!({"key": "k"})), &mut ctx).unwrap();
        assert_eq!(text(&recalled), json!([1, 2]));

        assert!(RecallValue.handle(&args(json!({"key": "other"})), &mut ctx).is_err());
        assert!(RememberValue.handle(&args(json!({"key": ""})), &mut ctx).is_err());
    }

    #[test]
    fn pair_programmer_focus() {
        let plain = PairProgrammer.message(&Map::new()).unwrap();
        assert!(!plain.contains("Focus on"));

        let focused = PairProgrammer
            .message(&args(json!({"focus": "error handling"})))
            .unwrap();
        assert!(focused.ends_with("Focus on: error handling."));

        let err = PairProgrammer.message(&args(json!({"focus": 3}))).unwrap_err();
        assert!(matches!(err, HandlerError::Protocol(_)));
    }

    #[test]
    fn about_is_json() {
        let about = About::new("srv", "1.2.3", "Be nice.");
        let value: Value = serde_json::from_str(&about.content().unwrap()).unwrap();
        assert_eq!(value, json!({"name": "srv", "version": "1.2.3", "instructions": "Be nice."}));
        assert_eq!(about.name(), "about");
    }

    #[test]
    fn env_template_reads_variable() {
        let name = "PATH";
        let params = UriParams::from([("name".to_string(), name.to_string())]);
        let uri = format!("env://{name}");
        if let Ok(expected) = std::env::var(name) {
            let resource = EnvVarTemplate.create_resource(&uri, &params).unwrap();
            assert_eq!(resource.content().unwrap(), expected);
        }

        let params = UriParams::from([(
            "name".to_string(),
            "MCP_STDIO_SERVER_SURELY_UNSET".to_string(),
        )]);
        let err = EnvVarTemplate
            .create_resource("env://MCP_STDIO_SERVER_SURELY_UNSET", &params)
            .err()
            .unwrap();
        assert!(matches!(err, HandlerError::Protocol(ref e) if e.code.code() == -32002));
    }

    #[test]
    fn manifest_registers_everything() {
        use crate::mcp::transport::MemoryTransport;

        let mut server = McpServer::new(MemoryTransport::new());
        register_all(&mut server, About::new("srv", "0.1.0", "")).unwrap();

        assert_eq!(server.tools().count(), 3);
        assert_eq!(server.prompts().count(), 1);
        assert!(server.resources().has_item("server://about"));
        assert!(server.resource_templates().has_item("env://{name}"));
    }
}
