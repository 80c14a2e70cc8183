//! Namespaced in-memory key/value store shared with tool handlers.
//!
//! Entries live until they are deleted or the process exits: there is no TTL,
//! eviction or size bound. The cache is owned by the server and lent to
//! handlers through [`crate::feature::ToolContext`]; it is not synchronised
//! and relies on the single-threaded message loop.

use std::collections::HashMap;

use serde_json::Value;

/// Default key prefix.
pub const DEFAULT_CACHE_PREFIX: &str = "mcp";

/// A process-lifetime cache whose keys are namespaced by a fixed prefix.
#[derive(Debug, Clone)]
pub struct Cache {
    prefix: String,
    entries: HashMap<String, Value>,
}

impl Cache {
    /// Creates an empty cache using `prefix` as the key namespace.
    #[must_use]
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            entries: HashMap::new(),
        }
    }

    /// The namespace prefix.
    #[must_use]
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    fn key(&self, key: &str) -> String {
        format!("{}:{key}", self.prefix)
    }

    /// Whether a value is stored under `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.entries.contains_key(&self.key(key))
    }

    /// Returns the value stored under `key`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(&self.key(key))
    }

    /// Stores `value` under `key`, replacing any previous value.
    pub fn set(&mut self, key: &str, value: impl Into<Value>) {
        let key = self.key(key);
        self.entries.insert(key, value.into());
    }

    /// Removes the value stored under `key`, returning it.
    pub fn delete(&mut self, key: &str) -> Option<Value> {
        self.entries.remove(&self.key(key))
    }

    /// Number of stored entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for Cache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PREFIX)
    }
}
