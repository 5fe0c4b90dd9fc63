//! IA Saver settings.
//!
//! Settings live in the key/value store under [`CONFIG_KEY`] and fall back to
//! [`SaverConfig::default`] when missing or unreadable.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::kv::{KeyValueStore, PersistenceError};

/// Persistence key of the settings.
pub const CONFIG_KEY: &str = "ia_saver_config";

/// Default location of the shared external blacklist.
pub const EXTERNAL_BLACKLIST_URL: &str =
    "https://raw.githubusercontent.com/gbzret4d/internet-archive-saver/main/blacklist.json";

/// Wayback availability endpoint; the encoded page URL is appended.
pub const ARCHIVE_CHECK_URL: &str = "https://archive.org/wayback/available?url=";

/// Save Page Now endpoint; the raw page URL is appended.
pub const ARCHIVE_SAVE_URL: &str = "https://web.archive.org/save/";

/// A snapshot younger than this is considered fresh (4 hours).
pub const DEFAULT_FRESHNESS_WINDOW_SECS: u64 = 4 * 60 * 60;

/// Cached availability responses are reused for this long (5 minutes).
pub const DEFAULT_STATUS_CACHE_TTL_SECS: u64 = 5 * 60;

/// Default HTTP timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Upper bound for every duration setting (one year).
pub const MAX_DURATION_SECS: u64 = 365 * 24 * 60 * 60;

/// IA Saver settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SaverConfig {
    /// Whether the external blacklist is fetched at all.
    pub load_external_blacklist: bool,
    /// Where the external blacklist is fetched from (empty disables it).
    pub external_blacklist_url: String,
    /// Availability endpoint prefix.
    pub archive_check_url: String,
    /// Save endpoint prefix.
    pub archive_save_url: String,
    /// Snapshot freshness window in seconds.
    pub freshness_window_secs: u64,
    /// Availability cache TTL in seconds (0 disables the cache).
    pub status_cache_ttl_secs: u64,
    /// HTTP request timeout in seconds.
    pub http_timeout_secs: u64,
    /// Whether a status badge is shown for each outcome.
    pub show_badges: bool,
}

impl Default for SaverConfig {
    fn default() -> Self {
        Self {
            load_external_blacklist: true,
            external_blacklist_url: EXTERNAL_BLACKLIST_URL.to_string(),
            archive_check_url: ARCHIVE_CHECK_URL.to_string(),
            archive_save_url: ARCHIVE_SAVE_URL.to_string(),
            freshness_window_secs: DEFAULT_FRESHNESS_WINDOW_SECS,
            status_cache_ttl_secs: DEFAULT_STATUS_CACHE_TTL_SECS,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            show_badges: true,
        }
    }
}

impl SaverConfig {
    /// Loads the settings, using defaults for anything missing.
    pub fn load(kv: &Arc<dyn KeyValueStore>) -> Result<Self, PersistenceError> {
        kv.get_or_default(CONFIG_KEY, Self::default())
    }

    /// Persists the settings.
    pub fn save(&self, kv: &Arc<dyn KeyValueStore>) -> Result<(), PersistenceError> {
        kv.set_typed(CONFIG_KEY, self)
    }

    /// Returns the external blacklist URL if loading is enabled.
    pub fn external_url(&self) -> Option<&str> {
        if self.load_external_blacklist && !self.external_blacklist_url.is_empty() {
            Some(&self.external_blacklist_url)
        } else {
            None
        }
    }

    /// Returns the HTTP timeout, clamped to `1..=MAX_DURATION_SECS` seconds.
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.clamp(1, MAX_DURATION_SECS))
    }

    /// Returns the freshness window, clamped to [`MAX_DURATION_SECS`].
    pub fn freshness_window(&self) -> chrono::Duration {
        bounded_seconds(self.freshness_window_secs)
    }

    /// Returns the availability cache TTL, clamped to [`MAX_DURATION_SECS`].
    pub fn status_cache_ttl(&self) -> chrono::Duration {
        bounded_seconds(self.status_cache_ttl_secs)
    }

    /// Sets one field from its name and a textual value.
    pub fn set_field(&mut self, field: &str, value: &str) -> Result<(), String> {
        fn parse_bool(value: &str) -> Result<bool, String> {
            match value.to_lowercase().as_str() {
                "true" | "yes" | "on" | "1" => Ok(true),
                "false" | "no" | "off" | "0" => Ok(false),
                _ => Err(format!("expected a boolean, got \"{value}\"")),
            }
        }

        fn parse_secs(value: &str) -> Result<u64, String> {
            let secs: u64 = value
                .parse()
                .map_err(|_| format!("expected a number of seconds, got \"{value}\""))?;
            if secs > MAX_DURATION_SECS {
                return Err(format!(
                    "{secs} seconds is too long (at most {MAX_DURATION_SECS})"
                ));
            }
            Ok(secs)
        }

        match field {
            "load_external_blacklist" => self.load_external_blacklist = parse_bool(value)?,
            "external_blacklist_url" => self.external_blacklist_url = value.to_string(),
            "archive_check_url" => self.archive_check_url = value.to_string(),
            "archive_save_url" => self.archive_save_url = value.to_string(),
            "freshness_window_secs" => self.freshness_window_secs = parse_secs(value)?,
            "status_cache_ttl_secs" => self.status_cache_ttl_secs = parse_secs(value)?,
            "http_timeout_secs" => {
                let secs = parse_secs(value)?;
                if secs == 0 {
                    return Err("the HTTP timeout must be at least 1 second".to_string());
                }
                self.http_timeout_secs = secs;
            }
            "show_badges" => self.show_badges = parse_bool(value)?,
            _ => return Err(format!("unknown setting \"{field}\"")),
        }
        Ok(())
    }
}

fn bounded_seconds(secs: u64) -> chrono::Duration {
    let secs = i64::try_from(secs.min(MAX_DURATION_SECS)).unwrap_or(i64::MAX);
    chrono::Duration::try_seconds(secs).unwrap_or(chrono::Duration::MAX)
}
