//! Command-line arguments.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// IA Saver - send visited pages to the Internet Archive
#[derive(Parser, Debug)]
#[command(name = "iasaver", version, about)]
pub struct Args {
    /// Enable debug logging (also logs to stderr)
    #[arg(long, global = true)]
    pub debug: bool,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    /// Database file (defaults to the app data directory)
    #[arg(long, global = true, value_name = "PATH")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Check a page against the blacklist and archive it if needed
    Check {
        /// Page URL
        url: String,
    },

    /// Manage the local blacklist
    Blacklist {
        #[command(subcommand)]
        command: BlacklistCommand,
    },

    /// Show or change settings
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },

    /// Maintain the archive status cache
    Cache {
        #[command(subcommand)]
        command: CacheCommand,
    },
}

/// `iasaver blacklist ...`
#[derive(Subcommand, Debug)]
pub enum BlacklistCommand {
    /// List local entries
    List,

    /// Add an entry
    Add {
        /// Domain, URL prefix or exact URL
        pattern: String,

        /// Match mode (domain, prefix, exact)
        #[arg(short, long, default_value = "domain")]
        mode: String,
    },

    /// Remove an entry by its number in `list`
    Remove {
        /// Entry number
        number: usize,
    },

    /// Replace the local blacklist with a JSON file
    Import {
        /// File to read
        file: PathBuf,
    },

    /// Write the local blacklist as JSON
    Export {
        /// Target file or directory (stdout when omitted)
        file: Option<PathBuf>,
    },
}

/// `iasaver config ...`
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// Print the current settings
    Show,

    /// Change one setting
    Set {
        /// Setting name
        field: String,

        /// New value
        value: String,
    },

    /// Restore the default settings
    Reset,
}

/// `iasaver cache ...`
#[derive(Subcommand, Debug)]
pub enum CacheCommand {
    /// Remove expired entries
    Prune,
}
