use std::io;

use anyhow::{Context, Result};
use tracing::Level;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use super::config::{LogConfig, LogFormat, RotationPolicy};

const LOG_FILE_PREFIX: &str = "teamboard.log";

/// Logger implementation using tracing
pub struct LoggerImpl {
    _guard: Option<WorkerGuard>,
}

impl LoggerImpl {
    /// Install the global subscriber.
    ///
    /// Console output goes to stderr in `config.format`. When `log_dir` is set a rolling
    /// file layer is added that always writes JSON; the returned value
    /// owns its flush guard and must be kept alive for the process.
    ///
    /// # Errors
    /// Returns an error for an unknown level or if a global subscriber
    /// is already installed.
    pub fn init(config: &LogConfig) -> Result<Self> {
        let default_level = parse_log_level(&config.level)?;
        let env_filter = || {
            EnvFilter::builder()
                .with_default_directive(default_level.into())
                .from_env_lossy()
        };

        let (file_layer, guard) = match &config.log_dir {
            Some(log_dir) => {
                let file_appender = match config.rotation {
                    RotationPolicy::Daily => rolling::daily(log_dir, LOG_FILE_PREFIX),
                    RotationPolicy::Hourly => rolling::hourly(log_dir, LOG_FILE_PREFIX),
                    RotationPolicy::Never => rolling::never(log_dir, LOG_FILE_PREFIX),
                };
                let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);
                let layer = tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(non_blocking_file)
                    .with_ansi(false)
                    .with_current_span(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_filter(env_filter());
                (Some(layer), Some(guard))
            }
            None => (None, None),
        };

        let json_console = (config.format == LogFormat::Json).then(|| {
            tracing_subscriber::fmt::layer()
                .json()
                .with_writer(io::stderr)
                .with_current_span(true)
                .with_target(true)
                .with_filter(env_filter())
        });
        let pretty_console = (config.format == LogFormat::Pretty).then(|| {
            tracing_subscriber::fmt::layer()
                .with_writer(io::stderr)
                .with_target(true)
                .with_filter(env_filter())
        });

        tracing_subscriber::registry()
            .with(file_layer)
            .with(json_console)
            .with(pretty_console)
            .try_init()
            .context("Failed to install tracing subscriber")?;

        tracing::debug!(
            level = %config.level,
            format = ?config.format,
            file_output = config.log_dir.is_some(),
            "logger initialized"
        );

        Ok(Self { _guard: guard })
    }

    #[cfg(test)]
    pub fn has_file_output(&self) -> bool {
        self._guard.is_some()
    }
}

/// Parse log level string to Level
fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!("Invalid log level: {level}"),
    }
}
