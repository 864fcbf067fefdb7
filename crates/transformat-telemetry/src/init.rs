//! Logging initialisation.
//!
//! Centralises subscriber setup (JSON or pretty) behind a single entry
//! point, with an optional non-blocking file appender for deployments that
//! do not want logs on stdout.

use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Default logging target when no level is configured.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Errors raised while installing the global subscriber.
#[derive(Debug, Error)]
pub enum TelemetryError {
    /// A subscriber was already installed globally.
    #[error("failed to install tracing subscriber")]
    AlreadyInstalled,
    /// The configured log file could not be opened.
    #[error("failed to open log file")]
    LogFileUnavailable {
        /// Path that could not be opened.
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for this crate.
pub type Result<T> = std::result::Result<T, TelemetryError>;

/// Output target for rendered log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogOutput {
    /// Write to standard output.
    Stdout,
    /// Write to a file through a non-blocking appender.
    File,
}

/// Available output formats for the logger.
#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    /// Emit logs as structured JSON objects.
    Json,
    /// Emit human-readable, pretty-printed logs.
    Pretty,
}

impl LogFormat {
    /// Choose a sensible default for the current build.
    #[must_use]
    pub const fn infer() -> Self {
        if cfg!(debug_assertions) {
            Self::Pretty
        } else {
            Self::Json
        }
    }

    fn parse(raw: &str) -> Option<Self> {
        match raw {
            "json" => Some(Self::Json),
            "pretty" => Some(Self::Pretty),
            _ => None,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig<'a> {
    /// Log level string (e.g., `info`, `debug`).
    pub level: &'a str,
    /// Output format selection for the tracing subscriber.
    pub format: LogFormat,
    /// Where rendered log lines are written.
    pub output: LogOutput,
    /// File path used when `output` is [`LogOutput::File`].
    pub file_path: &'a Path,
}

impl<'a> LoggingConfig<'a> {
    /// Build a [`LoggingConfig`] from the raw `LOG_LEVEL`/`LOG_FORMAT`
    /// environment strings, falling back to [`LogFormat::infer`] when the
    /// format string is absent or unrecognised.
    #[must_use]
    pub fn new(level: &'a str, format: Option<&str>, output: LogOutput, file_path: &'a Path) -> Self {
        Self {
            level,
            format: format.and_then(LogFormat::parse).unwrap_or_else(LogFormat::infer),
            output,
            file_path,
        }
    }
}

/// Guard that must stay alive for the lifetime of the process when logging
/// to a file; dropping it flushes and stops the background writer thread.
pub struct LoggingGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global tracing subscriber described by `config`.
///
/// # Errors
///
/// Returns [`TelemetryError`] if a subscriber is already installed globally
/// or the configured log file cannot be opened.
pub fn init_logging(config: &LoggingConfig) -> Result<LoggingGuard> {
    let filter = build_env_filter(config.level);

    match config.output {
        LogOutput::Stdout => {
            install(filter, config.format, BoxMakeWriter::new(std::io::stdout))?;
            Ok(LoggingGuard { _worker: None })
        }
        LogOutput::File => {
            if let Some(parent) = config.file_path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file =
                std::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(config.file_path)
                    .map_err(|source| TelemetryError::LogFileUnavailable {
                        path: config.file_path.display().to_string(),
                        source,
                    })?;
            let (writer, guard) = tracing_appender::non_blocking(file);
            install(filter, config.format, BoxMakeWriter::new(writer))?;
            Ok(LoggingGuard {
                _worker: Some(guard),
            })
        }
    }
}

fn install(filter: EnvFilter, format: LogFormat, writer: BoxMakeWriter) -> Result<()> {
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(writer),
            )
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInstalled),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_thread_ids(false)
                    .with_writer(writer),
            )
            .try_init()
            .map_err(|_| TelemetryError::AlreadyInstalled),
    }
}

fn build_env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_picks_pretty_in_debug_builds() {
        if cfg!(debug_assertions) {
            assert!(matches!(LogFormat::infer(), LogFormat::Pretty));
        } else {
            assert!(matches!(LogFormat::infer(), LogFormat::Json));
        }
    }

    #[test]
    fn parse_rejects_unknown_format() {
        assert!(LogFormat::parse("xml").is_none());
        assert!(matches!(LogFormat::parse("json"), Some(LogFormat::Json)));
    }
}
