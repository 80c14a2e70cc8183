//! Prompts: named, parameterised templates rendered into client messages.

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::error::HandlerError;
use crate::feature::registry::{Registry, RegistryItem};

/// Registry of prompts keyed by name.
pub type PromptRegistry = Registry<dyn Prompt>;

/// A prompt that can be fetched through `prompts/get`.
pub trait Prompt {
    /// Unique prompt name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> &str {
        ""
    }

    /// JSON Schema for the prompt's arguments.
    ///
    /// Every entry under `properties` becomes one listed argument, in
    /// declaration order; names in `required` are flagged as such.
    fn argument_schema(&self) -> Value {
        json!({"type": "object", "properties": {}, "required": []})
    }

    /// Renders the message text for the given arguments.
    ///
    /// # Errors
    ///
    /// A [`HandlerError::Protocol`] reaches the client unchanged; anything
    /// else becomes an `InternalError`.
    fn message(&self, arguments: &Map<String, Value>) -> Result<String, HandlerError>;

    /// Renders the full `prompts/get` result.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Prompt::message`].
    fn render(&self, arguments: &Map<String, Value>) -> Result<PromptResponse, HandlerError> {
        Ok(PromptResponse::text(self.description(), self.message(arguments)?))
    }
}

/// One argument entry in a listed prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptArgument {
    /// Argument name.
    pub name: String,
    /// Argument description (empty when the schema gives none).
    pub description: String,
    /// Whether the argument must be supplied.
    pub required: bool,
}

/// Derives the listed arguments from a prompt's parameter schema.
#[must_use]
pub fn prompt_arguments(schema: &Value) -> Vec<PromptArgument> {
    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    properties
        .iter()
        .map(|(name, property)| PromptArgument {
            name: name.clone(),
            description: property
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            required: required.contains(&name.as_str()),
        })
        .collect()
}

/// Text content of a prompt message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum PromptContent {
    /// Plain text.
    Text {
        /// The text.
        text: String,
    },
}

/// A single message in a rendered prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptMessage {
    /// Speaker role (always `user` for rendered prompts).
    pub role: String,
    /// Message content.
    pub content: PromptContent,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    description: Option<String>,
    messages: Vec<PromptMessage>,
}

impl PromptResponse {
    /// A single user message. An empty description is omitted.
    #[must_use]
    pub fn text(description: impl Into<String>, text: impl Into<String>) -> Self {
        let description = description.into();
        Self {
            description: (!description.is_empty()).then_some(description),
            messages: vec![PromptMessage {
                role: "user".to_string(),
                content: PromptContent::Text { text: text.into() },
            }],
        }
    }

    /// The rendered messages.
    #[must_use]
    pub fn messages(&self) -> &[PromptMessage] {
        &self.messages
    }
}

impl RegistryItem for dyn Prompt {
    const KIND: &'static str = "Prompt";

    fn key(&self) -> &str {
        self.name()
    }

    fn check(&self) -> Result<(), String> {
        match self.argument_schema().get("properties") {
            None | Some(Value::Object(_)) => Ok(()),
            Some(_) => Err("schema properties must be an object".to_string()),
        }
    }

    fn schema(&self) -> Value {
        let mut schema = json!({
            "name": self.name(),
            "description": self.description(),
        });

        let arguments = prompt_arguments(&self.argument_schema());
        if !arguments.is_empty() {
            schema["arguments"] = json!(arguments);
        }

        schema
    }
}
