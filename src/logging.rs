//! # Logging
//!
//! `tracing` subscriber setup. Logs go to stderr, or to a daily-rolling file
//! when `logging.log_dir` is set, so stdout stays free for the console.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Log file name prefix inside `log_dir`
pub const LOG_FILE_PREFIX: &str = "rover-remote.log";

/// Build the filter: `RUST_LOG` wins, otherwise the configured level
pub fn build_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

/// Install the global subscriber
///
/// Returns the file writer guard when logging to a file; keep it alive for
/// the whole session or buffered lines are lost.
///
/// # Panics
///
/// Panics if a global subscriber is already installed.
pub fn init(config: &LoggingConfig) -> Option<WorkerGuard> {
    let filter = build_filter(&config.level);

    match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(writer)
                .with_ansi(false)
                .init();
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .init();
            None
        }
    }
}
