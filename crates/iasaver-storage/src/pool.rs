//! Database connection pool.
//!
//! A single Mutex-protected connection. IA Saver runs one session or one
//! command at a time, so there is nothing to gain from a real pool.

use rusqlite::Connection;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use crate::error::{Result, StorageError};
use crate::schema::run_migrations;

/// Thread-safe database connection pool.
#[derive(Clone)]
pub struct ConnectionPool {
    conn: Arc<Mutex<Connection>>,
}

impl ConnectionPool {
    /// Create a new connection pool with a file-based database.
    pub fn new(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_connection(Connection::open(path)?)
    }

    /// Create a new connection pool with an in-memory database.
    pub fn in_memory() -> Result<Self> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self> {
        Self::setup_connection(&conn)?;
        run_migrations(&conn)?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Get a connection from the pool.
    pub fn get(&self) -> Result<PooledConnection<'_>> {
        let guard = self
            .conn
            .lock()
            .map_err(|_| StorageError::Config("Connection pool poisoned".to_string()))?;

        Ok(PooledConnection { guard })
    }

    /// Setup connection pragmas.
    fn setup_connection(conn: &Connection) -> Result<()> {
        // WAL keeps readers (a running session) from blocking CLI edits
        conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;

        Ok(())
    }
}

/// A connection borrowed from the pool.
pub struct PooledConnection<'a> {
    guard: MutexGuard<'a, Connection>,
}

impl std::ops::Deref for PooledConnection<'_> {
    type Target = Connection;

    fn deref(&self) -> &Self::Target {
        &self.guard
    }
}
