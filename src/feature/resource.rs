//! Resources addressed by URI, and templates that create them on demand.

use serde::Serialize;
use serde_json::{json, Value};

use crate::error::HandlerError;
use crate::feature::registry::{Registry, RegistryItem};
use crate::feature::uri_template::{UriParams, UriTemplate};

/// Registry of concrete resources keyed by URI.
pub type ResourceRegistry = Registry<dyn Resource>;

/// Registry of resource templates keyed by URI template.
pub type ResourceTemplateRegistry = Registry<dyn ResourceTemplate>;

/// A readable resource.
pub trait Resource {
    /// Unique resource URI.
    fn uri(&self) -> &str;

    /// Display name. Defaults to the last `/`-separated segment of the URI.
    fn name(&self) -> &str {
        let uri = self.uri();
        uri.rsplit('/').next().unwrap_or(uri)
    }

    /// Human-readable description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// MIME type of the content.
    fn mime_type(&self) -> Option<&str> {
        None
    }

    /// The resource body.
    ///
    /// # Errors
    ///
    /// A [`HandlerError::Protocol`] reaches the client unchanged; anything
    /// else becomes an `InternalError`.
    fn content(&self) -> Result<String, HandlerError>;

    /// The full `resources/read` result.
    ///
    /// # Errors
    ///
    /// Propagates errors from [`Resource::content`].
    fn response(&self) -> Result<ResourceResponse, HandlerError> {
        Ok(ResourceResponse::text(
            self.uri(),
            self.content()?,
            self.mime_type(),
        ))
    }
}

/// A family of resources whose URIs match a template.
pub trait ResourceTemplate {
    /// The URI template, e.g. `file:///{path}`.
    fn uri_template(&self) -> &str;

    /// Display name.
    fn name(&self) -> &str;

    /// Human-readable description.
    fn description(&self) -> Option<&str> {
        None
    }

    /// MIME type of the created resources.
    fn mime_type(&self) -> Option<&str> {
        None
    }

    /// Creates the concrete resource for a matched URI.
    ///
    /// # Errors
    ///
    /// Returns an error when the parameters do not name an existing resource.
    fn create_resource(
        &self,
        uri: &str,
        params: &UriParams,
    ) -> Result<Box<dyn Resource>, HandlerError>;
}

/// One item of a `resources/read` result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceContents {
    /// The resource URI.
    pub uri: String,
    /// Text body.
    pub text: String,
    /// MIME type, omitted when unknown.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,
}

/// Result of `resources/read`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceResponse {
    contents: Vec<ResourceContents>,
}

impl ResourceResponse {
    /// A single text item.
    #[must_use]
    pub fn text(uri: impl Into<String>, text: impl Into<String>, mime_type: Option<&str>) -> Self {
        Self {
            contents: vec![ResourceContents {
                uri: uri.into(),
                text: text.into(),
                mime_type: mime_type.map(str::to_string),
            }],
        }
    }

    /// The content items.
    #[must_use]
    pub fn contents(&self) -> &[ResourceContents] {
        &self.contents
    }
}

impl RegistryItem for dyn Resource {
    const KIND: &'static str = "Resource";

    fn key(&self) -> &str {
        self.uri()
    }

    fn check(&self) -> Result<(), String> {
        Ok(())
    }

    fn schema(&self) -> Value {
        json!({
            "uri": self.uri(),
            "name": self.name(),
            "description": self.description(),
            "mimeType": self.mime_type(),
        })
    }
}

impl RegistryItem for dyn ResourceTemplate {
    const KIND: &'static str = "Resource template";

    fn key(&self) -> &str {
        self.uri_template()
    }

    fn check(&self) -> Result<(), String> {
        let template = UriTemplate::parse(self.uri_template()).map_err(|e| e.to_string())?;
        if template.param_names().is_empty() {
            return Err("URI template declares no parameters".to_string());
        }
        Ok(())
    }

    fn schema(&self) -> Value {
        let mut schema = json!({
            "uriTemplate": self.uri_template(),
            "name": self.name(),
        });
        if let Some(description) = self.description() {
            schema["description"] = json!(description);
        }
        if let Some(mime_type) = self.mime_type() {
            schema["mimeType"] = json!(mime_type);
        }
        schema
    }
}

impl Registry<dyn ResourceTemplate> {
    /// Finds the first template, in registration order, that matches `uri`.
    #[must_use]
    pub fn find_match(&self, uri: &str) -> Option<(&dyn ResourceTemplate, UriParams)> {
        self.items().find_map(|(key, template)| {
            UriTemplate::parse(key)
                .ok()
                .and_then(|compiled| compiled.matches(uri))
                .map(|params| (template, params))
        })
    }
}
