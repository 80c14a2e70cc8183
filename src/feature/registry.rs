//! Insertion-ordered registry shared by all capability kinds.

use indexmap::IndexMap;
use serde_json::Value;

use crate::error::{ProtocolError, RegistryError};

/// Contract every registrable capability kind fulfils.
///
/// Implemented on the trait object types (`dyn Tool`, `dyn Prompt`, ...), so
/// a registry can only ever hold items of its own kind.
pub trait RegistryItem {
    /// Human-readable kind, used in error messages.
    const KIND: &'static str;

    /// The unique key within the registry.
    fn key(&self) -> &str;

    /// Kind-specific well-formedness predicate.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the item must be rejected.
    fn check(&self) -> Result<(), String>;

    /// The item as listed to clients.
    fn schema(&self) -> Value;
}

/// A registry of capability items keyed by [`RegistryItem::key`].
pub struct Registry<T: ?Sized + RegistryItem> {
    items: IndexMap<String, Box<T>>,
}

impl<T: ?Sized + RegistryItem> Registry<T> {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            items: IndexMap::new(),
        }
    }

    /// Registers an item.
    ///
    /// # Errors
    ///
    /// Returns `InvalidItem` if the item fails the kind predicate and
    /// `DuplicateKey` if the key is taken. The registry is unchanged on error.
    pub fn register(&mut self, item: Box<T>) -> Result<&mut Self, RegistryError> {
        let key = item.key().to_string();

        if key.is_empty() {
            return Err(RegistryError::InvalidItem {
                kind: T::KIND,
                key,
                reason: "key must not be empty".to_string(),
            });
        }

        item.check().map_err(|reason| RegistryError::InvalidItem {
            kind: T::KIND,
            key: key.clone(),
            reason,
        })?;

        if self.items.contains_key(&key) {
            return Err(RegistryError::DuplicateKey { kind: T::KIND, key });
        }

        self.items.insert(key, item);
        Ok(self)
    }

    /// Returns the item registered under `key`.
    #[must_use]
    pub fn get_item(&self, key: &str) -> Option<&T> {
        self.items.get(key).map(|item| &**item)
    }

    /// Returns the item registered under `key`, failing when absent.
    ///
    /// # Errors
    ///
    /// Returns a `ResourceNotFound` protocol error if nothing is registered
    /// under `key`.
    pub fn get(&self, key: &str) -> Result<&T, ProtocolError> {
        self.get_item(key)
            .ok_or_else(|| ProtocolError::resource_not_found(format!("{} not found: {key}", T::KIND)))
    }

    /// Whether an item is registered under `key`.
    #[must_use]
    pub fn has_item(&self, key: &str) -> bool {
        self.items.contains_key(key)
    }

    /// All items in registration order.
    pub fn items(&self) -> impl Iterator<Item = (&str, &T)> {
        self.items.iter().map(|(k, v)| (k.as_str(), &**v))
    }

    /// Number of registered items.
    #[must_use]
    pub fn count(&self) -> usize {
        self.items.len()
    }

    /// Whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Schemas of all items, in registration order.
    #[must_use]
    pub fn schemas(&self) -> Vec<Value> {
        self.items.values().map(|item| item.schema()).collect()
    }
}

impl<T: ?Sized + RegistryItem> Default for Registry<T> {
    fn default() -> Self {
        Self::new()
    }
}
