//! High-level database interface.

use std::path::PathBuf;

use directories::ProjectDirs;
use iasaver_core::{KeyValueStore, PersistenceError};
use serde_json::Value;
use tracing::info;

use crate::error::{Result, StorageError};
use crate::models::StoredValue;
use crate::pool::ConnectionPool;
use crate::repository::ValuesRepo;

/// File name of the database inside the data directory.
pub const DB_FILE_NAME: &str = "iasaver.db";

/// High-level database interface for IA Saver.
#[derive(Clone)]
pub struct Database {
    pool: ConnectionPool,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").finish_non_exhaustive()
    }
}

impl Database {
    /// Create a new database in the default app data directory.
    pub fn new() -> Result<Self> {
        Self::with_path(Self::default_db_path()?)
    }

    /// Create a new database at a specific path.
    pub fn with_path(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        // Create parent directories if they don't exist
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        info!("Opening database at: {:?}", path);
        let pool = ConnectionPool::new(&path)?;

        Ok(Self { pool })
    }

    /// Create an in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        let pool = ConnectionPool::in_memory()?;
        Ok(Self { pool })
    }

    /// Project directories for IA Saver.
    pub fn project_dirs() -> Result<ProjectDirs> {
        ProjectDirs::from("org", "iasaver", "iasaver")
            .ok_or_else(|| StorageError::Config("Could not determine app data directory".into()))
    }

    /// Get the default database path.
    pub fn default_db_path() -> Result<PathBuf> {
        Ok(Self::project_dirs()?.data_dir().join(DB_FILE_NAME))
    }

    /// Get a stored value.
    pub fn get(&self, key: &str) -> Result<Option<StoredValue>> {
        let conn = self.pool.get()?;
        ValuesRepo::get(&conn, key)
    }

    /// Set a stored value.
    pub fn set(&self, key: &str, value: &Value) -> Result<()> {
        let conn = self.pool.get()?;
        ValuesRepo::set(&conn, key, value)
    }

    /// Delete a stored value.
    pub fn delete(&self, key: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        ValuesRepo::delete(&conn, key)
    }

    /// List keys with a prefix.
    pub fn keys_with_prefix(&self, prefix: &str) -> Result<Vec<String>> {
        let conn = self.pool.get()?;
        ValuesRepo::keys_with_prefix(&conn, prefix)
    }
}

impl KeyValueStore for Database {
    fn get_value(&self, key: &str) -> std::result::Result<Option<Value>, PersistenceError> {
        Ok(self.get(key)?.map(|stored| stored.value))
    }

    fn set_value(&self, key: &str, value: &Value) -> std::result::Result<(), PersistenceError> {
        Ok(self.set(key, value)?)
    }

    fn delete_value(&self, key: &str) -> std::result::Result<bool, PersistenceError> {
        Ok(self.delete(key)?)
    }

    fn keys_with_prefix(&self, prefix: &str) -> std::result::Result<Vec<String>, PersistenceError> {
        Ok(Database::keys_with_prefix(self, prefix)?)
    }
}
