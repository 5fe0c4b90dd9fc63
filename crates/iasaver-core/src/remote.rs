//! Remote (shared, read-only) blacklist.
//!
//! Fetched once per page session. Every failure degrades to an empty list:
//! the page still gets archived, it just isn't protected by the shared rules.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::http::HttpClient;
use crate::rule::{parse_rule_payload, Rule};

/// Why the remote list was not used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DegradeReason {
    /// The server answered with a non-2xx status.
    #[error("server answered with status {0}")]
    Status(u16),
    /// The body is not a valid rule list.
    #[error("invalid list format: {0}")]
    InvalidPayload(String),
    /// No response was received.
    #[error("request failed: {0}")]
    Transport(String),
}

/// Outcome of a remote blacklist fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteRules {
    /// The whole payload was accepted.
    Loaded(Vec<Rule>),
    /// Loading is switched off; no request was made.
    Disabled,
    /// The fetch failed; no rules are used.
    Degraded(DegradeReason),
}

impl RemoteRules {
    /// Returns the accepted rules (empty unless loaded).
    pub fn into_rules(self) -> Vec<Rule> {
        match self {
            RemoteRules::Loaded(rules) => rules,
            RemoteRules::Disabled | RemoteRules::Degraded(_) => Vec::new(),
        }
    }
}

/// Fetches the external rule list.
#[derive(Clone)]
pub struct RemoteRuleFetch {
    client: Arc<dyn HttpClient>,
    url: Option<String>,
}

impl std::fmt::Debug for RemoteRuleFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteRuleFetch")
            .field("url", &self.url)
            .finish()
    }
}

impl RemoteRuleFetch {
    /// Creates a fetcher for `url`; `None` disables remote loading.
    pub fn new(client: Arc<dyn HttpClient>, url: Option<String>) -> Self {
        Self { client, url }
    }

    /// Returns the configured URL.
    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    /// Fetches and classifies the outcome. Never fails.
    pub async fn fetch_outcome(&self) -> RemoteRules {
        let Some(url) = self.url.as_deref() else {
            debug!("External blacklist disabled");
            return RemoteRules::Disabled;
        };

        let response = match self.client.get(url).await {
            Ok(response) => response,
            Err(e) => {
                warn!("Error loading external blacklist: {}", e);
                return RemoteRules::Degraded(DegradeReason::Transport(e.to_string()));
            }
        };

        if !response.is_success() {
            warn!(
                "Failed to load external blacklist, status: {}",
                response.status
            );
            return RemoteRules::Degraded(DegradeReason::Status(response.status));
        }

        match parse_rule_payload(&response.body) {
            Ok(rules) => {
                debug!("Loaded {} external blacklist entries", rules.len());
                RemoteRules::Loaded(rules)
            }
            Err(e) => {
                warn!("Invalid external blacklist format: {}", e);
                RemoteRules::Degraded(DegradeReason::InvalidPayload(e.to_string()))
            }
        }
    }

    /// Fetches the rules, or an empty list on any failure.
    pub async fn fetch(&self) -> Vec<Rule> {
        self.fetch_outcome().await.into_rules()
    }
}
