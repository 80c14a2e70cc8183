//! mcp-stdio-server: a Model Context Protocol server engine over stdio
//!
//! This library implements the server side of MCP: a line-delimited
//! JSON-RPC 2.0 codec, a lifecycle that gates every request behind
//! `initialize`, registries for tools, prompts, resources and resource
//! templates, capability negotiation and optional keepalive pings.
//!
//! # Architecture
//!
//! The server owns the protocol. Capabilities plug in through traits:
//!
//! - **Tools**: named actions with a JSON input schema, see [`feature::Tool`]
//! - **Prompts**: parameterised message templates, see [`feature::Prompt`]
//! - **Resources**: addressable text content, see [`feature::Resource`]
//! - **Resource templates**: URI patterns producing resources on demand,
//!   see [`feature::ResourceTemplate`]
//!
//! # Modules
//!
//! - [`builtin`]: Capabilities shipped with the binary
//! - [`cache`]: Key-value store shared by tool calls
//! - [`config`]: Configuration loading and validation
//! - [`error`]: Error types
//! - [`feature`]: Feature traits, registries and URI templates
//! - [`mcp`]: MCP protocol implementation

pub mod builtin;
pub mod cache;
pub mod config;
pub mod error;
pub mod feature;
pub mod mcp;
