//! Logging system initialization and configuration
//!
//! Uses the tracing ecosystem for structured logging with support for:
//! - Environment variable override (DIFFDECK_LOG)
//! - File output with daily rotation
//! - Pretty, compact or JSON console output
//! - In-memory log buffer for diagnostics and tests

pub mod layers;
pub mod throttle;

pub use layers::{LogBuffer, LogEntry};
pub use throttle::Throttle;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

use layers::LogBufferLayer;

/// Environment variable that overrides the configured filter
pub const LOG_ENV_VAR: &str = "DIFFDECK_LOG";

/// Default log buffer size
const DEFAULT_LOG_BUFFER_SIZE: usize = 200;

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level for the `diffdeck` target
    pub level: String,
    pub format: LogFormat,
    pub timestamps: bool,
    /// Show file and line numbers on the console
    pub file_line: bool,
    /// Also write a daily-rotated log file
    pub file_output: bool,
    /// Log file directory; defaults to the platform data directory
    pub file_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
            timestamps: true,
            file_line: false,
            file_output: false,
            file_path: None,
        }
    }
}

/// Console output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

impl LogFormat {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "json" => LogFormat::Json,
            "compact" => LogFormat::Compact,
            _ => LogFormat::Pretty,
        }
    }
}

fn default_log_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("diffdeck")
        .join("logs")
}

/// Initialize the global subscriber
///
/// Returns a [`LogBuffer`] holding the most recent events. Calling this
/// twice keeps the first subscriber.
///
/// # Environment Variables
/// - `DIFFDECK_LOG`: Override the filter (e.g., "diffdeck=debug,diffdeck::domain::task=trace")
pub fn init_logging(config: &LoggingConfig) -> LogBuffer {
    let level = parse_level(&config.level);
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR).unwrap_or_else(|_| {
        EnvFilter::new(format!("diffdeck={}", level.as_str().to_lowercase()))
    });

    let console_layer = match config.format {
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(false)
            .with_file(config.file_line)
            .with_line_number(config.file_line)
            .boxed(),
        LogFormat::Compact => {
            let layer = fmt::layer()
                .compact()
                .with_target(true)
                .with_file(config.file_line)
                .with_line_number(config.file_line);
            if config.timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
        LogFormat::Pretty => {
            let layer = fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_file(config.file_line)
                .with_line_number(config.file_line)
                .with_ansi(true);
            if config.timestamps {
                layer.boxed()
            } else {
                layer.without_time().boxed()
            }
        }
    };

    let file_layer = if config.file_output {
        let log_dir = config.file_path.clone().unwrap_or_else(default_log_dir);
        if let Err(e) = std::fs::create_dir_all(&log_dir) {
            eprintln!("Warning: Failed to create log directory {log_dir:?}: {e}");
            None
        } else {
            let file_appender = RollingFileAppender::new(Rotation::DAILY, &log_dir, "diffdeck.log");
            Some(
                fmt::layer()
                    .with_writer(file_appender)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true)
                    .with_ansi(false)
                    .boxed(),
            )
        }
    } else {
        None
    };

    let (log_buffer_layer, log_buffer) = LogBufferLayer::new(DEFAULT_LOG_BUFFER_SIZE);

    let installed = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .with(log_buffer_layer)
        .try_init();

    if installed.is_err() {
        tracing::debug!("Global subscriber already installed");
    } else {
        tracing::info!("Logging initialized");
        tracing::debug!(
            level = %level,
            format = ?config.format,
            file_output = config.file_output,
            "Logging configuration"
        );
    }

    log_buffer
}

/// Capture events on the current thread until the guard drops
///
/// Only the buffer layer is installed, at trace level.
pub fn capture(capacity: usize) -> (tracing::subscriber::DefaultGuard, LogBuffer) {
    let (layer, buffer) = LogBufferLayer::new(capacity);
    let subscriber = tracing_subscriber::registry().with(layer);
    (tracing::subscriber::set_default(subscriber), buffer)
}

/// Parse log level from string
pub fn parse_level(s: &str) -> Level {
    match s.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}
