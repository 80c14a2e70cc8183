//! Model Context Protocol (MCP) server implementation.
//!
//! The server speaks JSON-RPC 2.0 over a line-delimited transport, one JSON
//! document per line. Stdio is the production transport; an in-memory
//! transport backs the tests.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          MCP Server                          │
//! │                                                              │
//! │   ┌─────────────┐    ┌─────────────┐    ┌────────────────┐   │
//! │   │  Transport  │───▶│   Server    │───▶│   Registries   │   │
//! │   │   (stdio)   │    │ (lifecycle) │    │ tools/prompts/ │   │
//! │   └─────────────┘    └─────────────┘    │   resources    │   │
//! │          │              │       │       └────────────────┘   │
//! │          ▼              ▼       ▼                            │
//! │   ┌──────────────┐ ┌──────────┐ ┌────────────┐               │
//! │   │   Protocol   │ │Keepalive │ │ Capability │               │
//! │   │    codec     │ │  pings   │ │ negotiation│               │
//! │   └──────────────┘ └──────────┘ └────────────┘               │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05, but echoes
//! whatever version the client sends in `initialize`.

pub mod capability;
pub mod keepalive;
pub mod protocol;
pub mod server;
pub mod transport;

pub use capability::{negotiate, ServerCapabilities};
pub use keepalive::{Keepalive, KeepaliveAction};
pub use protocol::{
    parse_message, stringify, ErrorCode, ErrorObject, Message, Notification, Request, RequestId,
    Response, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
pub use server::{DispatchOutcome, McpServer, PingFailureCallback};
pub use transport::{MemoryTransport, StdioTransport, Transport};
