//! Archive decision and snapshot requests.
//!
//! For a page that is not blacklisted:
//!
//! 1. Resolve the URL the page ends up at (anonymous GET, redirects followed)
//! 2. Ask the availability endpoint for the closest snapshot
//! 3. Request a new snapshot when none exists or the newest one is older
//!    than the freshness window

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, info};

use crate::cache::StatusCache;
use crate::config::SaverConfig;
use crate::http::{FetchError, HttpClient};

/// Wayback timestamp format (`YYYYMMDDhhmmss`, UTC).
const TIMESTAMP_FORMAT: &str = "%Y%m%d%H%M%S";

/// Errors while checking archive availability.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The availability endpoint could not be reached.
    #[error("Failed to query archive availability: {0}")]
    Fetch(#[from] FetchError),

    /// The availability response could not be interpreted.
    #[error("Error parsing archive availability response: {0}")]
    InvalidResponse(String),
}

/// What the availability endpoint knows about a URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotStatus {
    /// No snapshot exists yet.
    Missing,
    /// The newest snapshot is older than the freshness window.
    Stale {
        /// Raw Wayback timestamp.
        timestamp: String,
        /// Parsed snapshot time.
        archived_at: DateTime<Utc>,
    },
    /// The newest snapshot is recent enough.
    Fresh {
        /// Raw Wayback timestamp.
        timestamp: String,
        /// Parsed snapshot time.
        archived_at: DateTime<Utc>,
    },
}

/// Parses a Wayback timestamp.
pub fn parse_timestamp(timestamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(timestamp, TIMESTAMP_FORMAT)
        .ok()
        .map(|naive| naive.and_utc())
}

/// Interprets an availability response.
///
/// A missing, null or empty `archived_snapshots` object means no snapshot.
/// Otherwise `archived_snapshots.closest.timestamp` must be present.
pub fn evaluate_availability(
    data: &Value,
    now: DateTime<Utc>,
    freshness_window: Duration,
) -> Result<SnapshotStatus, ArchiveError> {
    let snapshots = match data.get("archived_snapshots") {
        None | Some(Value::Null) => return Ok(SnapshotStatus::Missing),
        Some(Value::Object(map)) if map.is_empty() => return Ok(SnapshotStatus::Missing),
        Some(snapshots) => snapshots,
    };

    let timestamp = snapshots
        .get("closest")
        .and_then(|closest| closest.get("timestamp"))
        .and_then(Value::as_str)
        .ok_or_else(|| ArchiveError::InvalidResponse("missing closest snapshot timestamp".into()))?;

    let archived_at = parse_timestamp(timestamp).ok_or_else(|| {
        ArchiveError::InvalidResponse(format!("invalid snapshot timestamp \"{timestamp}\""))
    })?;

    let timestamp = timestamp.to_string();
    if now.signed_duration_since(archived_at) > freshness_window {
        Ok(SnapshotStatus::Stale {
            timestamp,
            archived_at,
        })
    } else {
        Ok(SnapshotStatus::Fresh {
            timestamp,
            archived_at,
        })
    }
}

/// Final result of one page session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveOutcome {
    /// The URL matched the blacklist; nothing was requested.
    Blacklisted {
        /// Page URL.
        url: String,
    },
    /// The page itself could not be loaded.
    ResolveFailed {
        /// Page URL.
        url: String,
        /// Failure description.
        reason: String,
    },
    /// The availability endpoint was unreachable.
    CheckUnavailable {
        /// Resolved URL.
        url: String,
        /// Failure description.
        reason: String,
    },
    /// The availability response was unusable.
    CheckFailed {
        /// Resolved URL.
        url: String,
        /// Failure description.
        reason: String,
    },
    /// A recent snapshot already exists.
    Fresh {
        /// Resolved URL.
        url: String,
        /// Raw Wayback timestamp of the snapshot.
        timestamp: String,
        /// Parsed snapshot time.
        archived_at: DateTime<Utc>,
    },
    /// A new snapshot was requested successfully.
    Archived {
        /// Resolved URL.
        url: String,
        /// Whether this is the first snapshot of the URL.
        first: bool,
    },
    /// The snapshot request failed.
    SaveFailed {
        /// Resolved URL.
        url: String,
        /// Response status, when a response arrived.
        status: Option<u16>,
        /// Failure description.
        reason: String,
    },
}

impl ArchiveOutcome {
    /// Returns the URL the outcome refers to.
    pub fn url(&self) -> &str {
        match self {
            ArchiveOutcome::Blacklisted { url }
            | ArchiveOutcome::ResolveFailed { url, .. }
            | ArchiveOutcome::CheckUnavailable { url, .. }
            | ArchiveOutcome::CheckFailed { url, .. }
            | ArchiveOutcome::Fresh { url, .. }
            | ArchiveOutcome::Archived { url, .. }
            | ArchiveOutcome::SaveFailed { url, .. } => url,
        }
    }

    /// Returns true for outcomes caused by a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ArchiveOutcome::ResolveFailed { .. }
                | ArchiveOutcome::CheckUnavailable { .. }
                | ArchiveOutcome::CheckFailed { .. }
                | ArchiveOutcome::SaveFailed { .. }
        )
    }
}

impl fmt::Display for ArchiveOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ArchiveOutcome::Blacklisted { .. } => write!(f, "Archiving skipped (Blacklist)"),
            ArchiveOutcome::ResolveFailed { reason, .. } => {
                write!(f, "Failed to load URL without cookies: {reason}")
            }
            ArchiveOutcome::CheckUnavailable { reason, .. } => {
                write!(f, "Failed to query archive availability: {reason}")
            }
            ArchiveOutcome::CheckFailed { reason, .. } => {
                write!(f, "Error parsing archive availability response: {reason}")
            }
            ArchiveOutcome::Fresh {
                timestamp,
                archived_at,
                ..
            } => write!(
                f,
                "Archiving not necessary, last archived at {} ({})",
                archived_at.format("%Y-%m-%d %H:%M:%S UTC"),
                timestamp
            ),
            ArchiveOutcome::Archived { url, first } => write!(
                f,
                "{} successfully! (https://web.archive.org/web/{})",
                if *first { "First archiving" } else { "Archived" },
                url
            ),
            ArchiveOutcome::SaveFailed {
                status: Some(_),
                reason,
                ..
            } => write!(f, "Archiving error: {reason}"),
            ArchiveOutcome::SaveFailed { reason, .. } => write!(f, "Archiving failed: {reason}"),
        }
    }
}

/// Talks to the availability and save endpoints.
#[derive(Clone)]
pub struct Archiver {
    client: Arc<dyn HttpClient>,
    check_url: String,
    save_url: String,
    freshness_window: Duration,
    cache: Option<StatusCache>,
}

impl fmt::Debug for Archiver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Archiver")
            .field("check_url", &self.check_url)
            .field("save_url", &self.save_url)
            .field("freshness_window", &self.freshness_window)
            .field("cache", &self.cache)
            .finish()
    }
}

impl Archiver {
    /// Creates an archiver from the endpoint settings.
    pub fn new(client: Arc<dyn HttpClient>, config: &SaverConfig) -> Self {
        Self {
            client,
            check_url: config.archive_check_url.clone(),
            save_url: config.archive_save_url.clone(),
            freshness_window: config.freshness_window(),
            cache: None,
        }
    }

    /// Reuses availability responses from `cache`.
    pub fn with_cache(mut self, cache: StatusCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Availability request URL for `url` (query-encoded).
    pub fn availability_url(&self, url: &str) -> String {
        let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
        format!("{}{}", self.check_url, encoded)
    }

    /// Save request URL for `url` (appended verbatim).
    pub fn save_url(&self, url: &str) -> String {
        format!("{}{}", self.save_url, url)
    }

    /// Loads the page anonymously and returns the URL reached after redirects.
    pub async fn resolve(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).await?;
        if response.final_url != url {
            debug!("{} resolved to {}", url, response.final_url);
        }
        Ok(response.final_url)
    }

    /// Asks the availability endpoint about `url`.
    pub async fn check(&self, url: &str) -> Result<SnapshotStatus, ArchiveError> {
        let now = Utc::now();

        let cached = self.cache.as_ref().and_then(|cache| cache.get(url, now));
        let data = match cached {
            Some(data) => data,
            None => {
                let response = self.client.get(&self.availability_url(url)).await?;
                let data: Value = serde_json::from_str(&response.body)
                    .map_err(|e| ArchiveError::InvalidResponse(e.to_string()))?;

                if let (Some(cache), true) = (&self.cache, response.is_success()) {
                    cache.put(url, data.clone(), now);
                }
                data
            }
        };

        evaluate_availability(&data, now, self.freshness_window)
    }

    /// Requests a new snapshot of `url`.
    pub async fn save(&self, url: &str, first: bool) -> ArchiveOutcome {
        info!("Starting archiving for {}...", url);

        let outcome = match self.client.get(&self.save_url(url)).await {
            Ok(response) if response.status == 200 || response.status == 201 => {
                if let Some(cache) = &self.cache {
                    cache.invalidate(url);
                }
                ArchiveOutcome::Archived {
                    url: url.to_string(),
                    first,
                }
            }
            Ok(response) => ArchiveOutcome::SaveFailed {
                url: url.to_string(),
                status: Some(response.status),
                reason: format!("{} - {}", response.status, response.status_text),
            },
            Err(e) => ArchiveOutcome::SaveFailed {
                url: url.to_string(),
                status: None,
                reason: e.to_string(),
            },
        };

        if outcome.is_failure() {
            error!("{}", outcome);
        } else {
            info!("{}", outcome);
        }
        outcome
    }

    /// Runs resolve, check and (when needed) save for a page.
    pub async fn archive_if_needed(&self, page_url: &str) -> ArchiveOutcome {
        let url = match self.resolve(page_url).await {
            Ok(url) => url,
            Err(e) => {
                let outcome = ArchiveOutcome::ResolveFailed {
                    url: page_url.to_string(),
                    reason: e.to_string(),
                };
                error!("{}", outcome);
                return outcome;
            }
        };

        debug!("Checking archive availability for: {}", url);
        match self.check(&url).await {
            Ok(SnapshotStatus::Missing) => {
                info!("Archiving needed: No archive found for {}", url);
                self.save(&url, true).await
            }
            Ok(SnapshotStatus::Stale { timestamp, .. }) => {
                info!(
                    "Archiving needed: Last archive is older than {} hours for {} (archived at {})",
                    self.freshness_window.num_hours(),
                    url,
                    timestamp
                );
                self.save(&url, false).await
            }
            Ok(SnapshotStatus::Fresh {
                timestamp,
                archived_at,
            }) => {
                let outcome = ArchiveOutcome::Fresh {
                    url,
                    timestamp,
                    archived_at,
                };
                info!("{}", outcome);
                outcome
            }
            Err(ArchiveError::Fetch(e)) => {
                let outcome = ArchiveOutcome::CheckUnavailable {
                    url,
                    reason: e.to_string(),
                };
                error!("{}", outcome);
                outcome
            }
            Err(ArchiveError::InvalidResponse(reason)) => {
                let outcome = ArchiveOutcome::CheckFailed { url, reason };
                error!("{}", outcome);
                outcome
            }
        }
    }
}
