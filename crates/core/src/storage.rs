//! Per-browser key-value storage capability.
//!
//! Cart, profile and the local order counter live in a string-to-string
//! store owned by the caller: browser-local storage in the original setting,
//! a session map in the storefront, a [`MemoryStore`] in tests.

use std::collections::HashMap;

use serde::Serialize;
use serde::de::DeserializeOwned;

/// Storage key for the cart.
pub const CART_KEY: &str = "cart";

/// Storage key for the user profile.
pub const PROFILE_KEY: &str = "tiffin_user";

/// Storage key for the per-browser order counter.
pub const ORDER_COUNTER_KEY: &str = "order_counter";

/// Storage key for the checkout stage.
pub const CHECKOUT_KEY: &str = "checkout";

/// A string key-value store.
pub trait KeyValueStore {
    /// Read a value.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value, replacing any previous one.
    fn set(&mut self, key: &str, value: String);

    /// Delete a value. Missing keys are ignored.
    fn remove(&mut self, key: &str);
}

/// Read a JSON value. Missing keys and undecodable values both yield `None`;
/// the latter is logged since it means the stored shape changed.
pub fn get_json<T: DeserializeOwned>(store: &impl KeyValueStore, key: &str) -> Option<T> {
    let raw = store.get(key)?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::warn!(key, error = %err, "discarding undecodable stored value");
            None
        }
    }
}

/// Write a value as JSON.
///
/// # Errors
///
/// Returns an error if the value cannot be serialized.
pub fn set_json<T: Serialize>(
    store: &mut impl KeyValueStore,
    key: &str,
    value: &T,
) -> Result<(), serde_json::Error> {
    let raw = serde_json::to_string(value)?;
    store.set(key, raw);
    Ok(())
}

/// In-memory store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from an existing map.
    #[must_use]
    pub const fn from_map(entries: HashMap<String, String>) -> Self {
        Self { entries }
    }

    /// Consume the store and return its entries.
    #[must_use]
    pub fn into_map(self) -> HashMap<String, String> {
        self.entries
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: String) {
        self.entries.insert(key.to_string(), value);
    }

    fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) {
        (**self).set(key, value);
    }

    fn remove(&mut self, key: &str) {
        (**self).remove(key);
    }
}
