//! Short-lived cache of archive availability responses.
//!
//! Entries are stored per URL under [`CACHE_KEY_PREFIX`] as
//! `{timestamp, data}`, where `timestamp` is the store time in milliseconds
//! since the epoch and `data` the raw availability JSON. Cache failures are
//! logged and treated as misses.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::kv::{KeyValueStore, PersistenceError};

/// Key prefix of cached availability responses.
pub const CACHE_KEY_PREFIX: &str = "ia_saver_cache:";

/// One cached availability response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    /// Store time in milliseconds since the epoch.
    pub timestamp: i64,
    /// Raw availability response.
    pub data: Value,
}

impl CacheEntry {
    fn is_fresh(&self, now: DateTime<Utc>, ttl: Duration) -> bool {
        now.timestamp_millis() - self.timestamp < ttl.num_milliseconds()
    }
}

/// Availability cache over the key/value store.
#[derive(Clone)]
pub struct StatusCache {
    kv: Arc<dyn KeyValueStore>,
    ttl: Duration,
}

impl std::fmt::Debug for StatusCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusCache").field("ttl", &self.ttl).finish()
    }
}

impl StatusCache {
    /// Creates a cache whose entries stay valid for `ttl`.
    pub fn new(kv: Arc<dyn KeyValueStore>, ttl: Duration) -> Self {
        Self { kv, ttl }
    }

    fn key(url: &str) -> String {
        format!("{CACHE_KEY_PREFIX}{url}")
    }

    /// Returns the cached response for `url` if it is still fresh.
    pub fn get(&self, url: &str, now: DateTime<Utc>) -> Option<Value> {
        let value = match self.kv.get_value(&Self::key(url)) {
            Ok(value) => value?,
            Err(e) => {
                warn!("Failed to read archive status cache: {}", e);
                return None;
            }
        };

        let entry: CacheEntry = serde_json::from_value(value).ok()?;
        if entry.is_fresh(now, self.ttl) {
            debug!("Using cached archive status for {}", url);
            Some(entry.data)
        } else {
            None
        }
    }

    /// Stores a response for `url`.
    pub fn put(&self, url: &str, data: Value, now: DateTime<Utc>) {
        let entry = CacheEntry {
            timestamp: now.timestamp_millis(),
            data,
        };

        let result = serde_json::to_value(&entry)
            .map_err(PersistenceError::from)
            .and_then(|value| self.kv.set_value(&Self::key(url), &value));

        if let Err(e) = result {
            warn!("Failed to write archive status cache: {}", e);
        }
    }

    /// Drops the entry for `url` (after a new snapshot was requested).
    pub fn invalidate(&self, url: &str) {
        if let Err(e) = self.kv.delete_value(&Self::key(url)) {
            warn!("Failed to invalidate archive status cache: {}", e);
        }
    }

    /// Removes expired and unreadable entries. Returns how many were removed.
    pub fn prune(&self, now: DateTime<Utc>) -> Result<usize, PersistenceError> {
        let mut removed = 0;

        for key in self.kv.keys_with_prefix(CACHE_KEY_PREFIX)? {
            let expired = match self.kv.get_value(&key)? {
                Some(value) => serde_json::from_value::<CacheEntry>(value)
                    .map_or(true, |entry| !entry.is_fresh(now, self.ttl)),
                None => false,
            };

            if expired && self.kv.delete_value(&key)? {
                removed += 1;
            }
        }

        if removed > 0 {
            debug!("Pruned {} archive status cache entries", removed);
        }
        Ok(removed)
    }
}
