//! MCP server: lifecycle, method routing and the poll loop.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: capability negotiation; every request except
//!    `initialize` and `ping` is rejected until it succeeds
//! 2. **Operation**: routing requests to the tool, prompt and resource registries
//! 3. **Shutdown**: SIGINT/SIGTERM (Ctrl+C on Windows) or stdin EOF
//!
//! Failures travel on two separate channels. A [`ProtocolError`] becomes a
//! JSON-RPC error response. A failing tool becomes a *successful* response
//! whose content carries the message and `isError: true`.

use std::time::{Duration, Instant};

use serde::Serialize;
use serde_json::{json, Map, Value};

use crate::cache::Cache;
use crate::error::{HandlerError, ProtocolError, RegistryError, TransportError};
use crate::feature::{
    Prompt, PromptRegistry, Resource, ResourceRegistry, ResourceTemplate,
    ResourceTemplateRegistry, Tool, ToolContext, ToolRegistry, ToolResponse,
};
use crate::mcp::capability::negotiate;
use crate::mcp::keepalive::{Keepalive, KeepaliveAction};
use crate::mcp::protocol::{
    parse_message, stringify, Message, Notification, Request, RequestId, Response,
    MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::mcp::transport::Transport;

/// Idle delay between polls when no input is waiting.
pub const IDLE_POLL_INTERVAL: Duration = Duration::from_millis(100);

const NOT_INITIALIZED: &str = "Server not initialized. Call initialize first.";

/// Called when a keepalive ping goes unanswered.
pub type PingFailureCallback = Box<dyn FnMut() + Send>;

/// Outcome of dispatching one request, before it is shaped into a response.
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchOutcome {
    /// The result payload.
    Success(Value),
    /// A tool handler failed; reported as a successful, error-flagged result.
    ToolError(String),
    /// The request failed at the protocol level.
    ProtocolFailure(ProtocolError),
}

impl DispatchOutcome {
    /// Shapes the outcome into the response for request `id`.
    #[must_use]
    pub fn into_response(self, id: RequestId) -> Response {
        match self {
            Self::Success(result) => Response::success(id, result),
            Self::ToolError(message) => {
                let content = ToolResponse::error(format!("Error executing tool: {message}"));
                match serde_json::to_value(content) {
                    Ok(result) => Response::success(id, result),
                    Err(e) => Response::from_protocol_error(
                        Some(id),
                        &ProtocolError::internal(format!("Internal server error: {e}")),
                    ),
                }
            }
            Self::ProtocolFailure(error) => Response::from_protocol_error(Some(id), &error),
        }
    }
}

/// The MCP protocol engine, generic over its transport.
pub struct McpServer<T: Transport> {
    transport: T,
    name: String,
    version: String,
    instructions: String,
    initialized: bool,
    tools: ToolRegistry,
    prompts: PromptRegistry,
    resources: ResourceRegistry,
    resource_templates: ResourceTemplateRegistry,
    cache: Cache,
    keepalive: Keepalive,
    on_ping_failure: Option<PingFailureCallback>,
}

impl<T: Transport> McpServer<T> {
    /// Creates a server with the default name and the crate version.
    #[must_use]
    pub fn new(transport: T) -> Self {
        Self::with_identity(transport, SERVER_NAME, env!("CARGO_PKG_VERSION"))
    }

    /// Creates a server reporting the given name and version in `serverInfo`.
    #[must_use]
    pub fn with_identity(transport: T, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            transport,
            name: name.into(),
            version: version.into(),
            instructions: String::new(),
            initialized: false,
            tools: ToolRegistry::new(),
            prompts: PromptRegistry::new(),
            resources: ResourceRegistry::new(),
            resource_templates: ResourceTemplateRegistry::new(),
            cache: Cache::default(),
            keepalive: Keepalive::new(),
            on_ping_failure: None,
        }
    }

    /// Sets the instructions returned on `initialize`.
    pub fn instructions(&mut self, instructions: impl Into<String>) -> &mut Self {
        self.instructions = instructions.into();
        self
    }

    /// Replaces the tool cache.
    pub fn cache(&mut self, cache: Cache) -> &mut Self {
        self.cache = cache;
        self
    }

    /// Registers a tool. Tools whose `should_register` is false are skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the tool is malformed.
    pub fn tool(&mut self, tool: Box<dyn Tool>) -> Result<&mut Self, RegistryError> {
        if !tool.should_register() {
            tracing::debug!(tool = tool.name(), "Tool declined registration");
            return Ok(self);
        }
        self.tools.register(tool)?;
        Ok(self)
    }

    /// Registers a prompt.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is taken or the prompt is malformed.
    pub fn prompt(&mut self, prompt: Box<dyn Prompt>) -> Result<&mut Self, RegistryError> {
        self.prompts.register(prompt)?;
        Ok(self)
    }

    /// Registers a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI is taken.
    pub fn resource(&mut self, resource: Box<dyn Resource>) -> Result<&mut Self, RegistryError> {
        self.resources.register(resource)?;
        Ok(self)
    }

    /// Registers a resource template. Templates are matched in registration order.
    ///
    /// # Errors
    ///
    /// Returns an error if the template is taken or malformed.
    pub fn resource_template(
        &mut self,
        template: Box<dyn ResourceTemplate>,
    ) -> Result<&mut Self, RegistryError> {
        self.resource_templates.register(template)?;
        Ok(self)
    }

    /// Configures outbound keepalive pings.
    ///
    /// Resets the interval and forgets any pending ping. Without a callback,
    /// a timeout is only logged.
    pub fn configure_ping(
        &mut self,
        enabled: bool,
        interval: Duration,
        timeout: Duration,
        on_failure: Option<PingFailureCallback>,
    ) -> &mut Self {
        self.keepalive.configure(enabled, interval, timeout, Instant::now());
        self.on_ping_failure = on_failure;
        self
    }

    /// Sends a keepalive ping now, unless one is already pending.
    pub fn ping(&mut self) {
        if let Some(pending) = self.keepalive.pending_id() {
            tracing::debug!(id = %pending, "Ping skipped, still waiting for a response");
            return;
        }

        let id = RequestId::String(format!("ping-{}", uuid::Uuid::new_v4()));
        let request = Message::Request(Request::new(id.clone(), "ping", None));

        match self.write_message(&request) {
            Ok(()) => {
                tracing::debug!(id = %id, "Sent keepalive ping");
                self.keepalive.record_sent(id, Instant::now());
            }
            Err(e) => tracing::warn!(id = %id, error = %e, "Failed to send keepalive ping"),
        }
    }

    /// Id of the outstanding keepalive ping.
    #[must_use]
    pub fn pending_ping_id(&self) -> Option<&RequestId> {
        self.keepalive.pending_id()
    }

    /// Whether `initialize` has been handled.
    #[must_use]
    pub const fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// The transport.
    #[must_use]
    pub const fn transport(&self) -> &T {
        &self.transport
    }

    /// The transport, mutably.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The tool registry.
    #[must_use]
    pub const fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    /// The prompt registry.
    #[must_use]
    pub const fn prompts(&self) -> &PromptRegistry {
        &self.prompts
    }

    /// The resource registry.
    #[must_use]
    pub const fn resources(&self) -> &ResourceRegistry {
        &self.resources
    }

    /// The resource template registry.
    #[must_use]
    pub const fn resource_templates(&self) -> &ResourceTemplateRegistry {
        &self.resource_templates
    }

    /// Runs the keepalive state machine once.
    pub fn poll_keepalive(&mut self, now: Instant) {
        match self.keepalive.poll(now, self.initialized) {
            KeepaliveAction::Idle => {}
            KeepaliveAction::TimedOut(id) => {
                tracing::warn!(id = %id, "Keepalive ping timed out");
                match self.on_ping_failure.as_mut() {
                    Some(callback) => callback(),
                    None => tracing::debug!("No ping failure callback configured"),
                }
            }
            KeepaliveAction::SendPing => self.ping(),
        }
    }

    /// One loop iteration without signal handling or sleeping: keepalive
    /// bookkeeping, then at most one message.
    ///
    /// Returns `Ok(true)` if a message was handled and `Ok(false)` if none
    /// was waiting.
    ///
    /// # Errors
    ///
    /// Returns the transport error when reading fails or the input is closed.
    pub fn tick(&mut self) -> Result<bool, TransportError> {
        self.poll_keepalive(Instant::now());

        match self.transport.read()? {
            Some(line) => {
                self.handle_line(&line);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Parses and handles one line of input, writing any response.
    pub fn handle_line(&mut self, line: &str) {
        tracing::debug!(message = line, "Received message");

        match parse_message(line) {
            Ok(Message::Request(request)) => {
                let response = self.handle_request(&request);
                self.send(&Message::Response(response));
            }
            Ok(Message::Notification(notification)) => Self::handle_notification(&notification),
            Ok(Message::Response(response)) => self.handle_response(&response),
            Err(error) => {
                tracing::warn!(error = %error, "Rejected malformed message");
                self.send(&Message::Response(Response::from_protocol_error(None, &error)));
            }
        }
    }

    /// Handles a request and returns its response. Never fails: every error
    /// is shaped into an error response bound to the request id.
    pub fn handle_request(&mut self, request: &Request) -> Response {
        let outcome = self
            .dispatch(request)
            .unwrap_or_else(DispatchOutcome::ProtocolFailure);

        if let DispatchOutcome::ProtocolFailure(error) = &outcome {
            tracing::debug!(
                method = request.method(),
                code = error.code.code(),
                error = %error,
                "Request failed"
            );
        }

        outcome.into_response(request.id().clone())
    }

    fn dispatch(&mut self, request: &Request) -> Result<DispatchOutcome, ProtocolError> {
        let method = request.method();

        if !self.initialized && method != "initialize" && method != "ping" {
            return Err(ProtocolError::invalid_request(NOT_INITIALIZED));
        }

        match method {
            "initialize" => Ok(self.handle_initialize(request)),
            "ping" => Ok(DispatchOutcome::Success(json!({}))),
            "tools/list" => Ok(DispatchOutcome::Success(json!({"tools": self.tools.schemas()}))),
            "tools/call" => self.handle_tools_call(request),
            "prompts/list" => Ok(DispatchOutcome::Success(
                json!({"prompts": self.prompts.schemas()}),
            )),
            "prompts/get" => self.handle_prompts_get(request),
            "resources/list" => Ok(DispatchOutcome::Success(
                json!({"resources": self.resources.schemas()}),
            )),
            "resources/read" => self.handle_resources_read(request),
            "resources/templates/list" => Ok(DispatchOutcome::Success(
                json!({"resourceTemplates": self.resource_templates.schemas()}),
            )),
            other => Err(ProtocolError::method_not_found(format!(
                "Method not found: {other}"
            ))),
        }
    }

    fn handle_initialize(&mut self, request: &Request) -> DispatchOutcome {
        let client_capabilities = request.param("capabilities").unwrap_or(&Value::Null);

        if let Some(client) = request.param("clientInfo") {
            tracing::info!(client = %client, "Client initializing");
        }

        let capabilities = negotiate(
            client_capabilities,
            self.tools.count(),
            self.prompts.count(),
            self.resources.count(),
        );

        let protocol_version = request
            .param("protocolVersion")
            .cloned()
            .unwrap_or_else(|| Value::String(MCP_PROTOCOL_VERSION.to_string()));

        self.initialized = true;
        tracing::info!(protocol_version = %protocol_version, "Session initialized");

        DispatchOutcome::Success(json!({
            "protocolVersion": protocol_version,
            "capabilities": capabilities,
            "serverInfo": {
                "name": self.name,
                "version": self.version,
            },
            "instructions": self.instructions,
        }))
    }

    fn handle_tools_call(&mut self, request: &Request) -> Result<DispatchOutcome, ProtocolError> {
        let name = request
            .param("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProtocolError::invalid_params("Missing tool name"))?;

        let empty = Map::new();
        let arguments = object_param(request, "arguments", &empty)?;

        let Some(tool) = self.tools.get_item(name) else {
            tracing::debug!(tool = name, "Unknown tool");
            return Err(ProtocolError::method_not_found(format!("Unknown tool: {name}")));
        };

        let mut ctx = ToolContext::new(&mut self.cache);
        match tool.handle(arguments, &mut ctx) {
            Ok(response) => to_success(&response),
            Err(e) => {
                tracing::warn!(tool = name, error = %e, "Tool execution failed");
                Ok(DispatchOutcome::ToolError(e.to_string()))
            }
        }
    }

    fn handle_prompts_get(&self, request: &Request) -> Result<DispatchOutcome, ProtocolError> {
        let name = request
            .param("name")
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .ok_or_else(|| ProtocolError::invalid_request("Missing prompt name"))?;

        let prompt = self.prompts.get(name)?;

        let empty = Map::new();
        let arguments = object_param(request, "arguments", &empty)?;

        let response = prompt
            .render(arguments)
            .map_err(|e| handler_failure(e, "Error rendering prompt"))?;

        to_success(&response)
    }

    fn handle_resources_read(&self, request: &Request) -> Result<DispatchOutcome, ProtocolError> {
        let uri = request
            .param("uri")
            .and_then(Value::as_str)
            .filter(|uri| !uri.is_empty())
            .ok_or_else(|| ProtocolError::invalid_params("Missing required parameter: uri"))?;

        let response = if let Some(resource) = self.resources.get_item(uri) {
            resource.response()
        } else if let Some((template, params)) = self.resource_templates.find_match(uri) {
            tracing::debug!(uri, template = template.uri_template(), "Matched resource template");
            template
                .create_resource(uri, &params)
                .and_then(|resource| resource.response())
        } else {
            return Err(ProtocolError::resource_not_found(format!(
                "Resource not found: {uri}"
            )));
        };

        let response = response.map_err(|e| handler_failure(e, "Internal server error"))?;

        to_success(&response)
    }

    fn handle_notification(notification: &Notification) {
        match notification.method() {
            "notifications/initialized" => tracing::info!("Client reported initialized"),
            method => tracing::debug!(method, "Received notification"),
        }
    }

    fn handle_response(&mut self, response: &Response) {
        if let Some(id) = response.id() {
            if self.keepalive.acknowledge(id) {
                tracing::debug!(id = %id, "Received keepalive pong");
                return;
            }
        }

        tracing::debug!(id = ?response.id(), "Ignoring response to unknown request");
    }

    fn write_message(&mut self, message: &Message) -> Result<(), TransportError> {
        let json = stringify(message).map_err(|e| TransportError::Io(e.into()))?;
        tracing::debug!(message = %json, "Sending message");
        self.transport.write(&json)
    }

    fn send(&mut self, message: &Message) {
        if let Err(e) = self.write_message(message) {
            tracing::error!(error = %e, "Failed to write message");
        }
    }

    /// Runs the poll loop until a shutdown signal arrives or the input closes.
    ///
    /// # Errors
    ///
    /// Returns an error if signal handlers cannot be installed or reading
    /// the transport fails.
    pub async fn run(&mut self) -> std::io::Result<()> {
        let mut shutdown = Shutdown::install()?;

        loop {
            if let Some(signal) = shutdown.poll_now().await {
                tracing::info!("Received {signal}, shutting down");
                return Ok(());
            }

            match self.tick() {
                Ok(true) => {}
                Ok(false) => {
                    tokio::select! {
                        signal = shutdown.recv() => {
                            tracing::info!("Received {signal}, shutting down");
                            return Ok(());
                        }
                        () = tokio::time::sleep(IDLE_POLL_INTERVAL) => {}
                    }
                }
                Err(TransportError::Closed) => {
                    tracing::info!("Input closed, shutting down");
                    return Ok(());
                }
                Err(TransportError::Io(e)) => return Err(e),
            }
        }
    }
}

/// Extracts an optional object parameter; absent means `empty`.
fn object_param<'a>(
    request: &'a Request,
    name: &str,
    empty: &'a Map<String, Value>,
) -> Result<&'a Map<String, Value>, ProtocolError> {
    match request.param(name) {
        None => Ok(empty),
        Some(Value::Object(map)) => Ok(map),
        Some(_) => Err(ProtocolError::invalid_params(format!(
            "Parameter '{name}' must be an object"
        ))),
    }
}

fn to_success<S: Serialize>(value: &S) -> Result<DispatchOutcome, ProtocolError> {
    serde_json::to_value(value)
        .map(DispatchOutcome::Success)
        .map_err(|e| {
            tracing::error!(error = %e, "Failed to serialise result");
            ProtocolError::internal(format!("Internal server error: {e}"))
        })
}

/// Protocol errors raised by a handler pass through; anything else becomes
/// an `InternalError` prefixed with `context`.
fn handler_failure(error: HandlerError, context: &str) -> ProtocolError {
    match error {
        HandlerError::Protocol(error) => error,
        other => {
            tracing::error!(error = %other, "{context}");
            ProtocolError::internal(format!("{context}: {other}"))
        }
    }
}

/// Shutdown signal listeners.
#[cfg(unix)]
struct Shutdown {
    sigint: tokio::signal::unix::Signal,
    sigterm: tokio::signal::unix::Signal,
}

#[cfg(unix)]
impl Shutdown {
    fn install() -> std::io::Result<Self> {
        use tokio::signal::unix::{signal, SignalKind};

        Ok(Self {
            sigint: signal(SignalKind::interrupt())?,
            sigterm: signal(SignalKind::terminate())?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        tokio::select! {
            _ = self.sigint.recv() => "SIGINT",
            _ = self.sigterm.recv() => "SIGTERM",
        }
    }

    /// Returns a signal that is already pending, without waiting.
    async fn poll_now(&mut self) -> Option<&'static str> {
        tokio::select! {
            biased;
            signal = self.recv() => Some(signal),
            () = std::future::ready(()) => None,
        }
    }
}

/// Shutdown signal listeners.
#[cfg(windows)]
struct Shutdown {
    ctrl_c: tokio::signal::windows::CtrlC,
}

#[cfg(windows)]
impl Shutdown {
    fn install() -> std::io::Result<Self> {
        Ok(Self {
            ctrl_c: tokio::signal::windows::ctrl_c()?,
        })
    }

    async fn recv(&mut self) -> &'static str {
        self.ctrl_c.recv().await;
        "Ctrl+C"
    }

    /// Returns a signal that is already pending, without waiting.
    async fn poll_now(&mut self) -> Option<&'static str> {
        tokio::select! {
            biased;
            signal = self.recv() => Some(signal),
            () = std::future::ready(()) => None,
        }
    }
}
