//! Row types.

use serde::Serialize;

/// A stored key/value pair.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoredValue {
    /// Key.
    pub key: String,
    /// Value (JSON).
    pub value: serde_json::Value,
}
