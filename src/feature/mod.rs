//! Capability kinds exposed to MCP clients and the registries that hold them.
//!
//! - [`Tool`]: invokable with JSON arguments through `tools/call`
//! - [`Prompt`]: rendered into client messages through `prompts/get`
//! - [`Resource`]: read by URI through `resources/read`
//! - [`ResourceTemplate`]: creates resources for URIs matching a `{param}` template

pub mod prompt;
pub mod registry;
pub mod resource;
pub mod tool;
pub mod uri_template;

pub use prompt::{Prompt, PromptRegistry, PromptResponse};
pub use registry::{Registry, RegistryItem};
pub use resource::{
    Resource, ResourceRegistry, ResourceResponse, ResourceTemplate, ResourceTemplateRegistry,
};
pub use tool::{Tool, ToolAnnotations, ToolContent, ToolContext, ToolRegistry, ToolResponse};
pub use uri_template::{match_uri, UriParams, UriTemplate};
