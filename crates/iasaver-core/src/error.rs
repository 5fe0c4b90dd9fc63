//! Blacklist error types.

use thiserror::Error;

use crate::kv::PersistenceError;
use crate::rule::RuleMode;

/// Errors raised by local blacklist operations.
///
/// Remote fetch failures and unparsable candidate URLs never surface here;
/// they degrade inside [`crate::remote`] and [`crate::engine`].
#[derive(Debug, Error)]
pub enum BlacklistError {
    /// A rule or import payload does not have the required shape.
    #[error("{0}")]
    Validation(String),

    /// The rule is already present in the local blacklist.
    #[error("This entry is already in the blacklist: {pattern} [{mode}]")]
    DuplicateRule {
        /// Pattern of the rejected rule.
        pattern: String,
        /// Mode of the rejected rule.
        mode: RuleMode,
    },

    /// No entry exists at the given position.
    #[error("No blacklist entry at index {index} (blacklist has {len} entries)")]
    IndexOutOfRange {
        /// Requested position.
        index: usize,
        /// Number of entries at the time of the request.
        len: usize,
    },

    /// The key/value persistence service failed or holds unreadable data.
    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Result type for blacklist operations.
pub type Result<T> = std::result::Result<T, BlacklistError>;
