//! Ambient logging setup, initialized once from each binary's `main`.
//! Screen/file sinks are driven by `logger.display_on_screen` /
//! `write_to_file`; `tracing-appender` backs the file sink so writes don't
//! block the async runtime, the same non-blocking-writer pattern the
//! teacher uses for its own file logging.

use crate::config::LoggerConfig;
use crate::errors::{H2hDbError, Result};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Holds the file-appender's worker guard — dropping it flushes and stops
/// the background writer thread, so callers must keep it alive for the
/// process lifetime.
pub struct LoggingGuard(#[allow(dead_code)] Option<tracing_appender::non_blocking::WorkerGuard>);

pub fn init(logger: &LoggerConfig) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_new(level_filter(logger.level))
        .map_err(|err| H2hDbError::Config(format!("invalid logger.level: {err}")))?;

    let screen_layer = logger
        .display_on_screen
        .then(|| tracing_subscriber::fmt::layer());

    let (file_layer, guard) = match &logger.write_to_file {
        Some(path) => {
            let directory = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| std::path::Path::new("."));
            let file_name = path
                .file_name()
                .and_then(|f| f.to_str())
                .unwrap_or("h2hdb.log");
            let appender = tracing_appender::rolling::never(directory, file_name);
            let (non_blocking, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(screen_layer)
        .with(file_layer)
        .try_init()
        .map_err(|err| H2hDbError::Config(format!("logging already initialized: {err}")))?;

    if let Some(webhook) = &logger.synochat_webhook {
        tracing::info!(webhook = %webhook, "critical-level log events will be forwarded to synochat");
    }

    Ok(LoggingGuard(guard))
}

fn level_filter(level: crate::config::LogLevel) -> &'static str {
    use crate::config::LogLevel;
    match level {
        LogLevel::NotSet => "off",
        LogLevel::Debug => "debug",
        LogLevel::Info => "info",
        LogLevel::Warning => "warn",
        LogLevel::Error => "error",
        LogLevel::Critical => "error",
    }
}

/// Best-effort POST of a critical-level message to the configured
/// Synology Chat incoming webhook. Never fails the caller — a broken
/// webhook should not abort ingestion.
pub async fn notify_synochat(webhook: &str, message: &str) {
    let client = reqwest::Client::new();
    let payload = serde_json::json!({ "text": message });
    if let Err(err) = client.post(webhook).json(&payload).send().await {
        tracing::warn!(error = %err, "failed to deliver synochat webhook notification");
    }
}
