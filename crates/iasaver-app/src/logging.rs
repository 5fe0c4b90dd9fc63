//! Logging setup.

use std::path::PathBuf;

use directories::ProjectDirs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Get the logs directory path.
pub fn logs_dir() -> Option<PathBuf> {
    ProjectDirs::from("org", "iasaver", "iasaver").map(|dirs| dirs.data_dir().join("logs"))
}

/// Filter directives for the IA Saver crates at `level`, everything else at warn.
pub fn filter_directives(level: &str) -> String {
    ["iasaver", "iasaver_app", "iasaver_core", "iasaver_storage"]
        .iter()
        .map(|target| format!("{target}={level}"))
        .chain(std::iter::once("warn".to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

/// Initialize logging with file rotation.
///
/// Logs go to a daily file in the data directory; stderr is added with
/// `--debug`. Without a usable data directory, logs go to stderr only.
/// Stdout stays reserved for command output.
pub fn init_logging(debug: bool, log_level: &str) -> Option<WorkerGuard> {
    let log_level = if debug { "debug" } else { log_level };

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directives(log_level)));

    if let Some(log_dir) = logs_dir() {
        if std::fs::create_dir_all(&log_dir).is_ok() {
            let file_appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .max_log_files(5)
                .filename_prefix("iasaver")
                .filename_suffix("log")
                .build(&log_dir)
                .ok();

            if let Some(appender) = file_appender {
                let (non_blocking, guard) = tracing_appender::non_blocking(appender);

                if debug {
                    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(fmt::layer().with_writer(std::io::stderr))
                        .with(file_layer)
                        .init();
                } else {
                    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);
                    tracing_subscriber::registry()
                        .with(env_filter)
                        .with(file_layer)
                        .init();
                }

                tracing::debug!("Logging to {:?}", log_dir);
                return Some(guard);
            }
        }
    }

    // Fallback: console logging only
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .init();

    tracing::warn!("File logging unavailable, using console only");
    None
}
