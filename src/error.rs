//! Error types for mcp-stdio-server.
//!
//! Two error channels exist and must not be confused:
//!
//! - [`ProtocolError`] becomes a JSON-RPC error response bound to the request id.
//! - [`HandlerError`] is what tool, prompt and resource implementations return.
//!   The server decides per method how it surfaces (tool failures become
//!   successful responses flagged `isError`, prompt failures become
//!   `InternalError`, and so on).

use std::path::PathBuf;

use serde_json::Value;
use thiserror::Error;

use crate::mcp::protocol::{ErrorCode, ErrorObject};

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

/// Errors raised while populating a capability registry.
///
/// These are programming errors caught at startup, never protocol errors.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// An item with the same key is already registered.
    #[error("{kind} already registered: {key}")]
    DuplicateKey {
        /// Registry kind (`tool`, `prompt`, ...).
        kind: &'static str,
        /// The conflicting key.
        key: String,
    },

    /// The item does not satisfy the registry's predicate.
    #[error("invalid {kind} '{key}': {reason}")]
    InvalidItem {
        /// Registry kind (`tool`, `prompt`, ...).
        kind: &'static str,
        /// Key of the rejected item.
        key: String,
        /// Why the item was rejected.
        reason: String,
    },
}

/// Errors from the message transport.
#[derive(Error, Debug)]
pub enum TransportError {
    /// IO error during read/write.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer closed the stream.
    #[error("connection closed")]
    Closed,
}

/// A JSON-RPC protocol failure, carried back to the client as an error response.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{message}")]
pub struct ProtocolError {
    /// The JSON-RPC error code.
    pub code: ErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Optional structured detail.
    pub data: Option<Value>,
}

impl ProtocolError {
    /// Creates a protocol error with a custom message.
    #[must_use]
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    /// Adds structured detail to the error.
    #[must_use]
    pub fn with_data(mut self, data: Value) -> Self {
        self.data = Some(data);
        self
    }

    /// Input was not valid JSON.
    #[must_use]
    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ParseError, message)
    }

    /// Valid JSON, but not a valid JSON-RPC message (or not allowed right now).
    #[must_use]
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidRequest, message)
    }

    /// Unknown method (also used for unknown tool names).
    #[must_use]
    pub fn method_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::MethodNotFound, message)
    }

    /// A required parameter is missing or malformed.
    #[must_use]
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidParams, message)
    }

    /// Unexpected failure while handling a request.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// No resource, template or registry item matches the requested key.
    #[must_use]
    pub fn resource_not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ResourceNotFound, message)
    }

    /// Converts the error into its wire representation.
    #[must_use]
    pub fn to_error_object(&self) -> ErrorObject {
        ErrorObject {
            code: self.code.code(),
            message: self.message.clone(),
            data: self.data.clone(),
        }
    }
}

/// Errors returned by tool, prompt and resource implementations.
#[derive(Error, Debug)]
pub enum HandlerError {
    /// A free-form failure message.
    #[error("{0}")]
    Message(String),

    /// A failure that should reach the client with a specific JSON-RPC code.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// IO failure inside the handler.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// JSON (de)serialisation failure inside the handler.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl HandlerError {
    /// Creates a free-form handler error.
    #[must_use]
    pub fn msg(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self::Message(message)
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self::Message(message.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn validation_error_display() {
        let error = ConfigError::ValidationError {
            message: "invalid setting".to_string(),
        };
        let msg = error.to_string();
        assert!(msg.contains("invalid setting"));
    }

    #[test]
    fn duplicate_key_display() {
        let error = RegistryError::DuplicateKey {
            kind: "tool",
            key: "echo".to_string(),
        };
        assert_eq!(error.to_string(), "tool already registered: echo");
    }

    #[test]
    fn protocol_error_wire_shape() {
        let error = ProtocolError::resource_not_found("Resource not found: /x")
            .with_data(serde_json::json!({"uri": "/x"}));
        let object = error.to_error_object();
        assert_eq!(object.code, -32002);
        assert_eq!(object.message, "Resource not found: /x");
        assert_eq!(object.data, Some(serde_json::json!({"uri": "/x"})));
    }

    #[test]
    fn handler_error_wraps_protocol_error() {
        let error: HandlerError = ProtocolError::invalid_params("bad").into();
        assert!(matches!(error, HandlerError::Protocol(ref e) if e.code == ErrorCode::InvalidParams));
        assert_eq!(error.to_string(), "bad");
    }
}
