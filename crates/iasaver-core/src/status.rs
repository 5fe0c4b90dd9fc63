//! Status badge model.
//!
//! Each session outcome maps to a small badge: a colour, a Font Awesome icon
//! class, a tooltip and the page opened when it is clicked.

use serde::Serialize;

use crate::archive::ArchiveOutcome;

const WAYBACK_WEB: &str = "https://web.archive.org/web";

/// A rendered-agnostic status badge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// CSS colour.
    pub color: &'static str,
    /// Font Awesome icon classes.
    pub icon: &'static str,
    /// Hover text.
    pub tooltip: String,
    /// Click-through target.
    pub link: String,
}

impl Badge {
    fn new(color: &'static str, icon: &'static str, tooltip: String, link: String) -> Self {
        Self {
            color,
            icon,
            tooltip,
            link,
        }
    }

    /// Snapshot listing of `url`, the default click-through.
    pub fn listing_link(url: &str) -> String {
        format!("{WAYBACK_WEB}/*/{url}")
    }

    /// Badge shown while the archive check is running.
    pub fn checking(page_url: &str) -> Self {
        Self::new(
            "#007bff",
            "fas fa-spinner fa-spin",
            "Checking archive status... 🔄".to_string(),
            Self::listing_link(page_url),
        )
    }

    /// Badge for a finished session on `page_url`.
    pub fn for_outcome(outcome: &ArchiveOutcome, page_url: &str) -> Self {
        let default_link = Self::listing_link(page_url);
        match outcome {
            ArchiveOutcome::Blacklisted { .. } => Self::new(
                "gray",
                "fas fa-ban",
                format!("{outcome} ⛔"),
                default_link,
            ),
            ArchiveOutcome::Fresh { url, timestamp, .. } => Self::new(
                "darkorange",
                "fas fa-clock",
                format!("{outcome} 🕒"),
                format!("{WAYBACK_WEB}/{timestamp}/{url}"),
            ),
            ArchiveOutcome::Archived { url, .. } => Self::new(
                "green",
                "fas fa-check",
                format!("{outcome} ✅"),
                Self::listing_link(url),
            ),
            ArchiveOutcome::CheckUnavailable { .. } => Self::new(
                "orange",
                "fas fa-exclamation-circle",
                format!("{outcome} ⚠️"),
                default_link,
            ),
            ArchiveOutcome::ResolveFailed { .. }
            | ArchiveOutcome::CheckFailed { .. }
            | ArchiveOutcome::SaveFailed { .. } => Self::new(
                "#ff2e2e",
                "fas fa-exclamation-triangle",
                format!("{outcome} ❗"),
                default_link,
            ),
        }
    }
}
