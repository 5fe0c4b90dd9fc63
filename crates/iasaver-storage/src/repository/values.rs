//! Key/value repository.

use rusqlite::{params, Connection, OptionalExtension};

use crate::error::Result;
use crate::models::StoredValue;

/// Repository for the `kv_store` table.
pub struct ValuesRepo;

impl ValuesRepo {
    fn to_model(key: String, value: String) -> Result<StoredValue> {
        Ok(StoredValue {
            key,
            value: serde_json::from_str(&value)?,
        })
    }

    /// Get a value.
    pub fn get(conn: &Connection, key: &str) -> Result<Option<StoredValue>> {
        let row: Option<(String, String)> = conn
            .query_row(
                "SELECT key, value FROM kv_store WHERE key = ?1",
                [key],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        row.map(|(key, value)| Self::to_model(key, value)).transpose()
    }

    /// Set a value (insert or update).
    pub fn set(conn: &Connection, key: &str, value: &serde_json::Value) -> Result<()> {
        let value_json = serde_json::to_string(value)?;

        conn.execute(
            "INSERT INTO kv_store (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = ?2",
            params![key, value_json],
        )?;

        Ok(())
    }

    /// Delete a value.
    pub fn delete(conn: &Connection, key: &str) -> Result<bool> {
        let deleted = conn.execute("DELETE FROM kv_store WHERE key = ?1", [key])?;
        Ok(deleted > 0)
    }

    /// List keys starting with `prefix`, in key order.
    pub fn keys_with_prefix(conn: &Connection, prefix: &str) -> Result<Vec<String>> {
        let mut stmt = conn.prepare(
            "SELECT key FROM kv_store WHERE substr(key, 1, length(?1)) = ?1 ORDER BY key",
        )?;

        let keys = stmt
            .query_map([prefix], |row| row.get(0))?
            .collect::<rusqlite::Result<Vec<String>>>()?;

        Ok(keys)
    }
}
