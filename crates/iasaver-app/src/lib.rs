//! IA Saver - send visited pages to the Internet Archive.
//!
//! This crate backs the `iasaver` binary:
//!
//! - Argument parsing ([`cli`])
//! - Blacklist, settings and cache commands ([`commands`])
//! - File and console logging ([`logging`])
//!
//! # Usage
//!
//! ```no_run
//! use iasaver_app::commands;
//!
//! let kv = commands::open_store(None).unwrap();
//! commands::blacklist_add(kv.clone(), "example.com", "domain", &mut std::io::stdout()).unwrap();
//! commands::blacklist_list(kv, &mut std::io::stdout()).unwrap();
//! ```

pub mod cli;
pub mod commands;
pub mod logging;

pub use cli::{Args, BlacklistCommand, CacheCommand, Command, ConfigCommand};
