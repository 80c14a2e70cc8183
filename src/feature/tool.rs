//! Tools: invokable capabilities with a name, an input schema and a handler.

use base64::{engine::general_purpose::STANDARD as BASE64_STANDARD, Engine as _};
use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cache::Cache;
use crate::error::HandlerError;
use crate::feature::registry::{Registry, RegistryItem};

/// Registry of tools keyed by name.
pub type ToolRegistry = Registry<dyn Tool>;

/// Execution context lent to a tool for the duration of one call.
pub struct ToolContext<'a> {
    cache: &'a mut Cache,
}

impl<'a> ToolContext<'a> {
    /// Creates a context over the server's cache.
    #[must_use]
    pub fn new(cache: &'a mut Cache) -> Self {
        Self { cache }
    }

    /// The process-wide cache.
    pub fn cache(&mut self) -> &mut Cache {
        self.cache
    }
}

/// A tool that can be called through `tools/call`.
pub trait Tool {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// JSON Schema for the tool's arguments. Must be an `object` schema.
    fn input_schema(&self) -> Value;

    /// Behaviour hints; unset hints take the MCP defaults.
    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::default()
    }

    /// Whether the tool should be offered at all (e.g. a dependency is missing).
    fn should_register(&self) -> bool {
        true
    }

    /// Runs the tool.
    ///
    /// # Errors
    ///
    /// Any error is reported to the client as a successful response flagged
    /// `isError`, never as a JSON-RPC error.
    fn handle(
        &self,
        arguments: &Map<String, Value>,
        ctx: &mut ToolContext<'_>,
    ) -> Result<ToolResponse, HandlerError>;
}

/// Tool behaviour hints set by a tool. Unset fields take the defaults
/// applied by [`ToolAnnotations::resolve`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolAnnotations {
    title: Option<String>,
    read_only: Option<bool>,
    destructive: Option<bool>,
    idempotent: Option<bool>,
    open_world: Option<bool>,
}

impl ToolAnnotations {
    /// No overrides.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Human-readable title (defaults to the tool name).
    #[must_use]
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// The tool does not modify its environment (default `false`).
    #[must_use]
    pub const fn read_only(mut self, value: bool) -> Self {
        self.read_only = Some(value);
        self
    }

    /// The tool may perform destructive updates (default `true`).
    #[must_use]
    pub const fn destructive(mut self, value: bool) -> Self {
        self.destructive = Some(value);
        self
    }

    /// Repeated calls with the same arguments have no additional effect (default `false`).
    #[must_use]
    pub const fn idempotent(mut self, value: bool) -> Self {
        self.idempotent = Some(value);
        self
    }

    /// The tool interacts with external entities (default `true`).
    #[must_use]
    pub const fn open_world(mut self, value: bool) -> Self {
        self.open_world = Some(value);
        self
    }

    /// Merges the overrides with the MCP defaults.
    #[must_use]
    pub fn resolve(&self, tool_name: &str) -> ResolvedAnnotations {
        ResolvedAnnotations {
            destructive_hint: self.destructive.unwrap_or(true),
            idempotent_hint: self.idempotent.unwrap_or(false),
            open_world_hint: self.open_world.unwrap_or(true),
            read_only_hint: self.read_only.unwrap_or(false),
            title: self.title.clone().unwrap_or_else(|| tool_name.to_string()),
        }
    }
}

/// Fully-populated annotations as sent in `tools/list`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedAnnotations {
    /// May perform destructive updates.
    pub destructive_hint: bool,
    /// Safe to repeat.
    pub idempotent_hint: bool,
    /// Interacts with external entities.
    pub open_world_hint: bool,
    /// Does not modify its environment.
    pub read_only_hint: bool,
    /// Display title.
    pub title: String,
}

/// Content item in a tool call response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Text content.
    Text {
        /// The text content.
        text: String,
    },
    /// Base64-encoded image.
    Image {
        /// Base64 image data.
        data: String,
        /// Image MIME type.
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// Result of a tool call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolResponse {
    content: Vec<ToolContent>,
    is_error: bool,
}

impl ToolResponse {
    /// Creates a successful text result.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// Creates a successful result carrying JSON encoded as text.
    #[must_use]
    pub fn json(data: &Value) -> Self {
        Self::text(data.to_string())
    }

    /// Creates an image result from already base64-encoded data.
    #[must_use]
    pub fn image(base64_data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Image {
                data: base64_data.into(),
                mime_type: mime_type.into(),
            }],
            is_error: false,
        }
    }

    /// Creates an image result from raw bytes.
    #[must_use]
    pub fn image_bytes(bytes: &[u8], mime_type: impl Into<String>) -> Self {
        Self::image(BASE64_STANDARD.encode(bytes), mime_type)
    }

    /// Creates an error text result.
    #[must_use]
    pub fn error(message: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: message.into(),
            }],
            is_error: true,
        }
    }

    /// The content blocks.
    #[must_use]
    pub fn content(&self) -> &[ToolContent] {
        &self.content
    }

    /// Whether the result reports a tool failure.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        self.is_error
    }
}

impl RegistryItem for dyn Tool {
    const KIND: &'static str = "Tool";

    fn key(&self) -> &str {
        self.name()
    }

    fn check(&self) -> Result<(), String> {
        let schema = self.input_schema();
        if schema.get("type").and_then(Value::as_str) != Some("object") {
            return Err("input schema must be a JSON Schema of type \"object\"".to_string());
        }
        Ok(())
    }

    fn schema(&self) -> Value {
        json!({
            "name": self.name(),
            "description": self.description(),
            "inputSchema": self.input_schema(),
            "annotations": self.annotations().resolve(self.name()),
        })
    }
}
