//! Capability negotiation for the `initialize` handshake.

use serde::Serialize;
use serde_json::Value;

/// Server capabilities advertised in the `initialize` result.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ListChangedCapability>,
    /// Prompt-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<ListChangedCapability>,
    /// Resource-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourcesCapability>,
    /// Logging support.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logging: Option<EmptyCapability>,
}

/// Capability object carrying only `listChanged`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ListChangedCapability {
    /// Whether the list can change during the session.
    #[serde(rename = "listChanged")]
    pub list_changed: bool,
}

/// Resource capability object.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourcesCapability {
    /// Whether the resource list can change during the session.
    pub list_changed: bool,
    /// Whether clients may subscribe to resource updates (never offered).
    pub subscribe: bool,
}

/// A capability with no options, serialised as `{}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct EmptyCapability {}

/// Whether the client leaves `category` enabled. Only an explicit `false` disables.
fn client_allows(client: &Value, category: &str) -> bool {
    client.get(category) != Some(&Value::Bool(false))
}

/// Whether the client asked for `listChanged` on `category`. Only an explicit `true` enables.
fn client_wants_list_changed(client: &Value, category: &str) -> bool {
    client
        .get(category)
        .and_then(|c| c.get("listChanged"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

/// Computes the server capabilities from the client's declared capabilities
/// and the registry sizes.
///
/// A category is advertised when its registry is non-empty and the client
/// did not disable it. Logging is advertised unless the client disables it.
/// A non-object `client` value disables nothing.
#[must_use]
pub fn negotiate(
    client: &Value,
    tool_count: usize,
    prompt_count: usize,
    resource_count: usize,
) -> ServerCapabilities {
    let list_changed = |category: &str| ListChangedCapability {
        list_changed: client_wants_list_changed(client, category),
    };

    ServerCapabilities {
        tools: (tool_count > 0 && client_allows(client, "tools")).then(|| list_changed("tools")),
        prompts: (prompt_count > 0 && client_allows(client, "prompts"))
            .then(|| list_changed("prompts")),
        resources: (resource_count > 0 && client_allows(client, "resources")).then(|| {
            ResourcesCapability {
                list_changed: client_wants_list_changed(client, "resources"),
                subscribe: false,
            }
        }),
        logging: client_allows(client, "logging").then_some(EmptyCapability {}),
    }
}
