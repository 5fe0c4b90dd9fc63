//! IA Saver Core - blacklist rules, matching and archive decisions.
//!
//! This crate decides whether a visited page should be sent to the Internet
//! Archive. It handles:
//!
//! - Blacklist rules (`domain`, `prefix`, `exact`) and their validation
//! - The user-editable local blacklist, persisted in a key/value store
//! - The shared remote blacklist, fetched once per page session
//! - Merging both lists and matching URLs against them
//! - Checking snapshot freshness and requesting new snapshots
//!
//! # Example
//!
//! ```
//! use iasaver_core::{merge, Rule};
//!
//! let local = vec![Rule::domain("example.com")];
//! let external = vec![Rule::prefix("https://news.site/live/*")];
//! let rules = merge(&local, &external);
//!
//! assert!(rules.is_blacklisted("https://www.example.com/page"));
//! assert!(rules.is_blacklisted("https://news.site/live/today"));
//! assert!(!rules.is_blacklisted("https://news.site/"));
//! ```

pub mod archive;
pub mod blacklist;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod http;
pub mod kv;
pub mod remote;
pub mod rule;
pub mod session;
pub mod status;
pub mod store;

pub use archive::{ArchiveError, ArchiveOutcome, Archiver, SnapshotStatus};
pub use blacklist::Blacklist;
pub use cache::StatusCache;
pub use config::SaverConfig;
pub use engine::{is_blacklisted, merge, BlacklistEngine, MergedRuleSet};
pub use error::{BlacklistError, Result};
pub use http::{FetchError, HttpClient, HttpResponse, ReqwestClient};
pub use kv::{KeyValueStore, MemoryStore, PersistenceError};
pub use remote::{DegradeReason, RemoteRuleFetch, RemoteRules};
pub use rule::{Rule, RuleMode};
pub use session::{PageSession, SessionReport};
pub use status::Badge;
pub use store::RuleStore;
