//! Logging initialization
//!
//! Library code only emits `tracing` events; binaries embedding the store call
//! [`init_logging`] once at startup.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::storage::StoreError;

/// File name prefix for the daily log files
pub const LOG_FILE_PREFIX: &str = "paperdb.log";

/// Install the global subscriber. Keep the returned guard alive while logging
/// to a file, dropping it flushes pending lines.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<WorkerGuard>, StoreError> {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level));

    let stderr_layer = fmt::layer()
        .with_target(true)
        .with_ansi(config.ansi)
        .with_writer(std::io::stderr);

    let guard = match &config.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer()
                .with_target(true)
                .with_ansi(false)
                .with_writer(writer);

            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .with(file_layer)
                .try_init()
                .map_err(|e| StoreError::Config(format!("Failed to init logging: {}", e)))?;
            Some(guard)
        }
        None => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(stderr_layer)
                .try_init()
                .map_err(|e| StoreError::Config(format!("Failed to init logging: {}", e)))?;
            None
        }
    };

    tracing::info!(level = %config.level, "Logging initialized");
    Ok(guard)
}
