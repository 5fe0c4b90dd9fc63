//! IA Saver Storage - SQLite persistence layer.
//!
//! Everything IA Saver persists is a JSON value under a string key: the local
//! blacklist, the settings and cached archive lookups. This crate keeps those
//! values in a single SQLite table and exposes them through the core
//! [`KeyValueStore`](iasaver_core::KeyValueStore) trait.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use iasaver_core::{KeyValueStore, Rule, RuleStore};
//! use iasaver_storage::Database;
//!
//! let kv: Arc<dyn KeyValueStore> = Arc::new(Database::new().unwrap());
//! let mut store = RuleStore::open(kv).unwrap();
//! store.add(Rule::domain("example.com")).unwrap();
//! ```

mod database;
pub mod error;
pub mod models;
mod pool;
pub mod repository;
mod schema;

pub use database::{Database, DB_FILE_NAME};
pub use error::{Result, StorageError};
pub use models::StoredValue;
pub use pool::ConnectionPool;
pub use repository::ValuesRepo;
