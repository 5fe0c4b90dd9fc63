//! IA Saver - send visited pages to the Internet Archive.
//!
//! Checks a page against the local and shared blacklists, asks the Wayback
//! Machine how old its newest snapshot is and requests a new one when needed.

use std::io;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use iasaver_app::commands;
use iasaver_app::logging::init_logging;
use iasaver_app::{Args, BlacklistCommand, CacheCommand, Command, ConfigCommand};
use iasaver_core::{HttpClient, ReqwestClient, SaverConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Keep the guard alive so buffered file logs are flushed on exit
    let _log_guard = init_logging(args.debug, &args.log_level);

    tracing::debug!("IA Saver v{} starting", env!("CARGO_PKG_VERSION"));

    let kv = commands::open_store(args.db.as_deref())?;
    let mut out = io::stdout().lock();

    match args.command {
        Command::Check { url } => {
            let config = SaverConfig::load(&kv)?;
            let client: Arc<dyn HttpClient> = Arc::new(
                ReqwestClient::new(config.http_timeout()).context("Failed to create HTTP client")?,
            );
            commands::check(kv, client, &url, &mut out).await
        }
        Command::Blacklist { command } => match command {
            BlacklistCommand::List => commands::blacklist_list(kv, &mut out),
            BlacklistCommand::Add { pattern, mode } => {
                commands::blacklist_add(kv, &pattern, &mode, &mut out)
            }
            BlacklistCommand::Remove { number } => commands::blacklist_remove(kv, number, &mut out),
            BlacklistCommand::Import { file } => commands::blacklist_import(kv, &file, &mut out),
            BlacklistCommand::Export { file } => {
                commands::blacklist_export(kv, file.as_deref(), &mut out)
            }
        },
        Command::Config { command } => match command {
            ConfigCommand::Show => commands::config_show(kv, &mut out),
            ConfigCommand::Set { field, value } => {
                commands::config_set(kv, &field, &value, &mut out)
            }
            ConfigCommand::Reset => commands::config_reset(kv, &mut out),
        },
        Command::Cache { command } => match command {
            CacheCommand::Prune => commands::cache_prune(kv, &mut out),
        },
    }
}
