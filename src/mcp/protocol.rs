//! JSON-RPC 2.0 message types and codec for the MCP protocol.
//!
//! # Message Types
//!
//! - **Request**: A message expecting a response (has `id`)
//! - **Notification**: A one-way message (no `id`, no response expected)
//! - **Response**: A reply to a request, carrying exactly one of `result` or `error`
//!
//! Messages are immutable once constructed. Inbound text becomes a [`Message`]
//! through [`parse_message`]; outbound messages become text through [`stringify`].
//!
//! # MCP-Specific Constraints
//!
//! - Request IDs must be strings or integers (never `null`)
//! - A `result` is always encoded as a JSON object, even when empty

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ProtocolError;

/// The JSON-RPC version tag carried by every message.
pub const JSONRPC_VERSION: &str = "2.0";

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "mcp-stdio-server";

/// A JSON-RPC 2.0 request ID.
///
/// Per the MCP specification, IDs must be strings or integers, never `null`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
        }
    }
}

impl From<i64> for RequestId {
    fn from(id: i64) -> Self {
        Self::Number(id)
    }
}

impl From<&str> for RequestId {
    fn from(id: &str) -> Self {
        Self::String(id.to_string())
    }
}

impl From<String> for RequestId {
    fn from(id: String) -> Self {
        Self::String(id)
    }
}

/// A JSON-RPC 2.0 request message.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Request {
    jsonrpc: &'static str,
    id: RequestId,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl Request {
    /// Creates a new request.
    #[must_use]
    pub fn new(id: impl Into<RequestId>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: id.into(),
            method: method.into(),
            params,
        }
    }

    /// The correlation id.
    #[must_use]
    pub const fn id(&self) -> &RequestId {
        &self.id
    }

    /// The method to invoke.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The raw parameters, if any.
    #[must_use]
    pub const fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    /// Looks up a single named parameter. `null` counts as absent.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&Value> {
        self.params
            .as_ref()
            .and_then(|p| p.get(name))
            .filter(|v| !v.is_null())
    }
}

/// A JSON-RPC 2.0 notification message.
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Notification {
    jsonrpc: &'static str,
    method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl Notification {
    /// Creates a new notification.
    #[must_use]
    pub fn new(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method: method.into(),
            params,
        }
    }

    /// The notification method.
    #[must_use]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// The raw parameters, if any.
    #[must_use]
    pub const fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }
}

/// Standard JSON-RPC 2.0 error codes, plus the MCP resource extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    /// Invalid JSON was received by the server.
    ParseError,
    /// The JSON sent is not a valid Request object.
    InvalidRequest,
    /// The method does not exist or is not available.
    MethodNotFound,
    /// Invalid method parameters.
    InvalidParams,
    /// Internal JSON-RPC error.
    InternalError,
    /// MCP: the requested resource does not exist.
    ResourceNotFound,
    /// Server-defined error.
    ServerError(i32),
}

impl ErrorCode {
    /// Returns the numeric code for this error.
    #[must_use]
    pub const fn code(self) -> i32 {
        match self {
            Self::ParseError => -32700,
            Self::InvalidRequest => -32600,
            Self::MethodNotFound => -32601,
            Self::InvalidParams => -32602,
            Self::InternalError => -32603,
            Self::ResourceNotFound => -32002,
            Self::ServerError(code) => code,
        }
    }

    /// Maps a numeric code back to its variant.
    #[must_use]
    pub const fn from_code(code: i32) -> Self {
        match code {
            -32700 => Self::ParseError,
            -32600 => Self::InvalidRequest,
            -32601 => Self::MethodNotFound,
            -32602 => Self::InvalidParams,
            -32603 => Self::InternalError,
            -32002 => Self::ResourceNotFound,
            other => Self::ServerError(other),
        }
    }

    /// Returns the default message for this error code.
    #[must_use]
    pub const fn default_message(self) -> &'static str {
        match self {
            Self::ParseError => "Parse error",
            Self::InvalidRequest => "Invalid Request",
            Self::MethodNotFound => "Method not found",
            Self::InvalidParams => "Invalid params",
            Self::InternalError => "Internal error",
            Self::ResourceNotFound => "Resource not found",
            Self::ServerError(_) => "Server error",
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorObject {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl ErrorObject {
    /// Creates a new error from an error code.
    #[must_use]
    pub fn from_code(code: ErrorCode) -> Self {
        Self {
            code: code.code(),
            message: code.default_message().to_string(),
            data: None,
        }
    }
}

/// The body of a response: exactly one of `result` or `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponsePayload {
    /// Successful result, always a JSON object on the wire.
    Result(Map<String, Value>),
    /// Error details.
    Error(ErrorObject),
}

/// A JSON-RPC 2.0 response.
///
/// `id` is `None` only for errors that cannot be attributed to a request
/// (unparseable input); it is then encoded as `"id": null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Response {
    jsonrpc: &'static str,
    id: Option<RequestId>,
    #[serde(flatten)]
    payload: ResponsePayload,
}

impl Response {
    /// Builds a response from optional parts. Exactly one of `result` and
    /// `error` must be given; a `null` result becomes an empty object.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if both or neither of a result and an error
    /// are given.
    pub fn new(
        id: Option<RequestId>,
        result: Option<Value>,
        error: Option<ErrorObject>,
    ) -> Result<Self, ProtocolError> {
        let payload = match (result, error) {
            (Some(_), Some(_)) => {
                return Err(ProtocolError::invalid_request(
                    "Response cannot have both result and error",
                ))
            }
            (None, None) => {
                return Err(ProtocolError::invalid_request(
                    "Response must have either result or error",
                ))
            }
            (None, Some(error)) => ResponsePayload::Error(error),
            (Some(result), None) => ResponsePayload::Result(into_result_object(result)),
        };

        Ok(Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload,
        })
    }

    /// Creates a success response.
    #[must_use]
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id: Some(id),
            payload: ResponsePayload::Result(into_result_object(result)),
        }
    }

    /// Creates an error response.
    #[must_use]
    pub const fn error(id: Option<RequestId>, error: ErrorObject) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            payload: ResponsePayload::Error(error),
        }
    }

    /// Creates an error response from a protocol error.
    #[must_use]
    pub fn from_protocol_error(id: Option<RequestId>, error: &ProtocolError) -> Self {
        Self::error(id, error.to_error_object())
    }

    /// Creates the empty-result reply to a `ping` request.
    #[must_use]
    pub fn pong(id: RequestId) -> Self {
        Self::success(id, Value::Object(Map::new()))
    }

    /// The id of the request this response answers.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        self.id.as_ref()
    }

    /// The response body.
    #[must_use]
    pub const fn payload(&self) -> &ResponsePayload {
        &self.payload
    }

    /// The result object, if this is a success response.
    #[must_use]
    pub const fn result(&self) -> Option<&Map<String, Value>> {
        match &self.payload {
            ResponsePayload::Result(result) => Some(result),
            ResponsePayload::Error(_) => None,
        }
    }

    /// The error object, if this is an error response.
    #[must_use]
    pub const fn error_object(&self) -> Option<&ErrorObject> {
        match &self.payload {
            ResponsePayload::Result(_) => None,
            ResponsePayload::Error(error) => Some(error),
        }
    }

    /// Whether this is an error response.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self.payload, ResponsePayload::Error(_))
    }
}

/// Coerces any JSON value into a result object.
///
/// `null` and empty arrays become `{}` so empty results never collapse to
/// `[]` or `null` on the wire. Non-empty arrays are keyed by index and bare
/// scalars are wrapped as `{"scalar": value}`.
fn into_result_object(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        Value::Null => Map::new(),
        Value::Array(items) => items
            .into_iter()
            .enumerate()
            .map(|(i, v)| (i.to_string(), v))
            .collect(),
        scalar => {
            let mut map = Map::new();
            map.insert("scalar".to_string(), scalar);
            map
        }
    }
}

/// Any JSON-RPC message.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Message {
    /// A request expecting a response.
    Request(Request),
    /// A notification (no response expected).
    Notification(Notification),
    /// A response to an earlier request.
    Response(Response),
}

impl Message {
    /// Returns the method name for requests and notifications.
    #[must_use]
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request(req) => Some(req.method()),
            Self::Notification(notif) => Some(notif.method()),
            Self::Response(_) => None,
        }
    }

    /// Returns the id for requests and responses.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(req.id()),
            Self::Notification(_) => None,
            Self::Response(resp) => resp.id(),
        }
    }
}

impl From<Request> for Message {
    fn from(request: Request) -> Self {
        Self::Request(request)
    }
}

impl From<Notification> for Message {
    fn from(notification: Notification) -> Self {
        Self::Notification(notification)
    }
}

impl From<Response> for Message {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

/// Parses a JSON string into a message.
///
/// Classification, in order: `method` + `id` is a request, `method` alone is
/// a notification, `id` with `result` or `error` is a response. An `id` of
/// `null` counts as absent.
///
/// # Errors
///
/// Returns `ParseError` when the text is not JSON, and `InvalidRequest` when
/// it is JSON but not a well-formed JSON-RPC 2.0 message.
pub fn parse_message(json: &str) -> Result<Message, ProtocolError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| ProtocolError::parse_error(format!("Invalid JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| ProtocolError::invalid_request("Invalid JSON-RPC message"))?;

    if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
        return Err(ProtocolError::invalid_request("Invalid JSON-RPC message"));
    }

    let method = obj.get("method").filter(|v| !v.is_null());
    let id = obj.get("id").filter(|v| !v.is_null());

    match (method, id) {
        (Some(method), Some(id)) => Ok(Message::Request(Request::new(
            parse_id(id)?,
            parse_method(method)?,
            parse_params(obj)?,
        ))),
        (Some(method), None) => Ok(Message::Notification(Notification::new(
            parse_method(method)?,
            parse_params(obj)?,
        ))),
        (None, Some(id)) if obj.contains_key("result") || obj.contains_key("error") => {
            let error = match obj.get("error") {
                Some(error) => Some(
                    serde_json::from_value::<ErrorObject>(error.clone())
                        .map_err(|_| ProtocolError::invalid_request("Malformed error object"))?,
                ),
                None => None,
            };
            let result = obj.get("result").cloned().map(|r| match r {
                Value::Null => Value::Object(Map::new()),
                other => other,
            });
            Response::new(Some(parse_id(id)?), result, error).map(Message::Response)
        }
        _ => Err(ProtocolError::invalid_request(
            "Invalid JSON-RPC message structure",
        )),
    }
}

fn parse_id(id: &Value) -> Result<RequestId, ProtocolError> {
    match id {
        Value::String(s) => Ok(RequestId::String(s.clone())),
        Value::Number(n) => n
            .as_i64()
            .map(RequestId::Number)
            .ok_or_else(|| ProtocolError::invalid_request("id must be a string or an integer")),
        _ => Err(ProtocolError::invalid_request(
            "id must be a string or an integer",
        )),
    }
}

fn parse_method(method: &Value) -> Result<String, ProtocolError> {
    match method.as_str() {
        Some(m) if !m.is_empty() => Ok(m.to_string()),
        _ => Err(ProtocolError::invalid_request(
            "method must be a non-empty string",
        )),
    }
}

fn parse_params(obj: &Map<String, Value>) -> Result<Option<Value>, ProtocolError> {
    match obj.get("params") {
        None | Some(Value::Null) => Ok(None),
        Some(params @ (Value::Object(_) | Value::Array(_))) => Ok(Some(params.clone())),
        Some(_) => Err(ProtocolError::invalid_request(
            "params must be an object or an array",
        )),
    }
}

/// Serialises a message to a single line of JSON.
///
/// # Errors
///
/// Returns an error if serialisation fails.
pub fn stringify(message: &Message) -> serde_json::Result<String> {
    serde_json::to_string(message)
}
