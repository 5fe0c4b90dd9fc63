//! Key/value persistence boundary.
//!
//! Everything IA Saver persists (the local blacklist, settings, cached
//! availability responses) is a JSON value under a string key. The SQLite
//! backend lives in `iasaver-storage`; [`MemoryStore`] backs tests and
//! throwaway sessions.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

/// Failure reported by a persistence backend.
#[derive(Debug, Clone, Error)]
#[error("Persistence error: {0}")]
pub struct PersistenceError(pub String);

impl From<serde_json::Error> for PersistenceError {
    fn from(err: serde_json::Error) -> Self {
        PersistenceError(format!("JSON error: {err}"))
    }
}

/// A key/value store holding JSON values.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get_value(&self, key: &str) -> Result<Option<Value>, PersistenceError>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set_value(&self, key: &str, value: &Value) -> Result<(), PersistenceError>;

    /// Removes `key`. Returns whether a value was present.
    fn delete_value(&self, key: &str) -> Result<bool, PersistenceError>;

    /// Lists the keys starting with `prefix`.
    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, PersistenceError>;
}

impl dyn KeyValueStore {
    /// Get a typed value, falling back to `default` when the key is missing
    /// or the stored value does not deserialize as `T`.
    pub fn get_or_default<T: DeserializeOwned>(
        &self,
        key: &str,
        default: T,
    ) -> Result<T, PersistenceError> {
        match self.get_value(key)? {
            Some(value) => Ok(serde_json::from_value(value).unwrap_or(default)),
            None => Ok(default),
        }
    }

    /// Serialize and store a typed value.
    pub fn set_typed<T: Serialize>(&self, key: &str, value: &T) -> Result<(), PersistenceError> {
        let value = serde_json::to_value(value)?;
        self.set_value(key, &value)
    }
}

/// In-memory store. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    values: Arc<RwLock<HashMap<String, Value>>>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn poisoned() -> PersistenceError {
        PersistenceError("memory store lock poisoned".to_string())
    }
}

impl KeyValueStore for MemoryStore {
    fn get_value(&self, key: &str) -> Result<Option<Value>, PersistenceError> {
        let values = self.values.read().map_err(|_| Self::poisoned())?;
        Ok(values.get(key).cloned())
    }

    fn set_value(&self, key: &str, value: &Value) -> Result<(), PersistenceError> {
        let mut values = self.values.write().map_err(|_| Self::poisoned())?;
        values.insert(key.to_string(), value.clone());
        Ok(())
    }

    fn delete_value(&self, key: &str) -> Result<bool, PersistenceError> {
        let mut values = self.values.write().map_err(|_| Self::poisoned())?;
        Ok(values.remove(key).is_some())
    }

    fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>, PersistenceError> {
        let values = self.values.read().map_err(|_| Self::poisoned())?;
        let mut keys: Vec<String> = values
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        Ok(keys)
    }
}
