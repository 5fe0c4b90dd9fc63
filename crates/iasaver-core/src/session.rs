//! One page visit: load the blacklists, decide, archive.

use std::sync::Arc;

use tracing::info;

use crate::archive::{ArchiveOutcome, Archiver};
use crate::blacklist::Blacklist;
use crate::cache::StatusCache;
use crate::config::SaverConfig;
use crate::error::Result;
use crate::http::HttpClient;
use crate::kv::KeyValueStore;
use crate::remote::{RemoteRuleFetch, RemoteRules};
use crate::status::Badge;

/// Everything a page session produced.
#[derive(Debug, Clone)]
pub struct SessionReport {
    /// How the remote blacklist fetch went.
    pub remote: RemoteRules,
    /// Final outcome.
    pub outcome: ArchiveOutcome,
    /// Badge for the outcome, unless badges are turned off.
    pub badge: Option<Badge>,
}

/// Runs page sessions against shared collaborators.
#[derive(Clone)]
pub struct PageSession {
    kv: Arc<dyn KeyValueStore>,
    client: Arc<dyn HttpClient>,
    config: SaverConfig,
}

impl std::fmt::Debug for PageSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PageSession")
            .field("config", &self.config)
            .finish()
    }
}

impl PageSession {
    /// Creates a session runner.
    pub fn new(kv: Arc<dyn KeyValueStore>, client: Arc<dyn HttpClient>, config: SaverConfig) -> Self {
        Self { kv, client, config }
    }

    /// Returns the settings in use.
    pub fn config(&self) -> &SaverConfig {
        &self.config
    }

    fn archiver(&self) -> Archiver {
        let archiver = Archiver::new(self.client.clone(), &self.config);
        if self.config.status_cache_ttl_secs > 0 {
            archiver.with_cache(StatusCache::new(
                self.kv.clone(),
                self.config.status_cache_ttl(),
            ))
        } else {
            archiver
        }
    }

    /// Processes a visit to `page_url`.
    ///
    /// The remote list is fetched once and merged with the local rules before
    /// the URL is evaluated. Only store failures are returned as errors; every
    /// network failure ends up in the outcome.
    pub async fn run(&self, page_url: &str) -> Result<SessionReport> {
        self.run_with_status(page_url, |_| {}).await
    }

    /// Like [`run`](Self::run), calling `on_status` with the checking badge
    /// once the page passed the blacklist and before any archive request.
    /// Not called when badges are turned off.
    pub async fn run_with_status<F>(&self, page_url: &str, mut on_status: F) -> Result<SessionReport>
    where
        F: FnMut(&Badge),
    {
        let mut blacklist = Blacklist::open(self.kv.clone())?;

        let fetch = RemoteRuleFetch::new(
            self.client.clone(),
            self.config.external_url().map(str::to_string),
        );
        let remote = blacklist.refresh_external(&fetch).await;

        let outcome = if blacklist.is_blacklisted(page_url) {
            info!("URL is blacklisted, skipping archiving: {}", page_url);
            ArchiveOutcome::Blacklisted {
                url: page_url.to_string(),
            }
        } else {
            info!("Checking archiving necessity for: {}", page_url);
            if self.config.show_badges {
                on_status(&Badge::checking(page_url));
            }
            self.archiver().archive_if_needed(page_url).await
        };

        let badge = self
            .config
            .show_badges
            .then(|| Badge::for_outcome(&outcome, page_url));

        Ok(SessionReport {
            remote,
            outcome,
            badge,
        })
    }
}
