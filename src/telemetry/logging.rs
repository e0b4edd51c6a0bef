//! Logging setup.
//!
//! A JSON file layer (daily rolling, non-blocking) and a stderr console layer,
//! each with its own `EnvFilter`. Dependency targets that are chatty at debug
//! level are capped at `warn`.

use crate::error::{GeneratorError, Result};
use std::path::PathBuf;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt::format::FmtSpan, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer, Registry};

pub const HIVE_LOG_DIR: &str = "HIVE_LOG_DIR";
pub const HIVE_LOG_LEVEL: &str = "HIVE_LOG_LEVEL";
pub const HIVE_CONSOLE_LOG_LEVEL: &str = "HIVE_CONSOLE_LOG_LEVEL";
pub const HIVE_CONSOLE_LOGGING: &str = "HIVE_CONSOLE_LOGGING";
pub const HIVE_JSON_LOGS: &str = "HIVE_JSON_LOGS";

const LOG_FILE_PREFIX: &str = "hive-llm.log";

/// Targets capped at `warn` in every layer
const NOISY_TARGETS: &[&str] = &[
    "aws_smithy_runtime",
    "aws_smithy_http",
    "aws_config",
    "aws_credential_types",
    "hyper",
    "h2",
    "reqwest",
    "tokio",
];

/// Configuration for the logging system
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingConfig {
    /// Directory for the rolling log file; no file layer when unset
    pub log_dir: Option<PathBuf>,
    /// Log level for file output
    pub file_log_level: String,
    /// Log level for console output
    pub console_log_level: String,
    pub console_enabled: bool,
    /// JSON lines in the file layer instead of plain text
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            file_log_level: "info".to_string(),
            console_log_level: "warn".to_string(),
            console_enabled: true,
            json_format: true,
        }
    }
}

impl LoggingConfig {
    /// Create logging configuration from environment variables
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup(HIVE_LOG_DIR).filter(|d| !d.is_empty()) {
            config.log_dir = Some(PathBuf::from(dir));
        }
        if let Some(level) = lookup(HIVE_LOG_LEVEL) {
            config.file_log_level = level;
        }
        if let Some(level) = lookup(HIVE_CONSOLE_LOG_LEVEL) {
            config.console_log_level = level;
        }
        if let Some(enabled) = lookup(HIVE_CONSOLE_LOGGING) {
            config.console_enabled = enabled.parse().unwrap_or(true);
        }
        if let Some(json) = lookup(HIVE_JSON_LOGS) {
            config.json_format = json.parse().unwrap_or(true);
        }

        config
    }
}

/// Keeps the non-blocking file writer alive; drop it last to flush
#[derive(Debug)]
pub struct LoggingGuard {
    _file_guard: Option<WorkerGuard>,
}

fn filter(level: &str, fallback: &str) -> EnvFilter {
    let mut filter = EnvFilter::try_new(level).unwrap_or_else(|_| EnvFilter::new(fallback));
    for target in NOISY_TARGETS {
        if let Ok(directive) = format!("{}=warn", target).parse() {
            filter = filter.add_directive(directive);
        }
    }
    filter
}

/// Install the global subscriber
pub fn init_logging(config: LoggingConfig) -> Result<LoggingGuard> {
    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut file_guard = None;

    if let Some(log_dir) = &config.log_dir {
        std::fs::create_dir_all(log_dir).map_err(|e| {
            GeneratorError::configuration(format!("Failed to create log directory: {}", e))
        })?;

        let file_appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
        let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
        file_guard = Some(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(file_writer)
            .with_ansi(false)
            .with_span_events(FmtSpan::CLOSE)
            .with_timer(tracing_subscriber::fmt::time::ChronoUtc::new(
                "%Y-%m-%d %H:%M:%S%.3f UTC".to_string(),
            ))
            .with_file(true)
            .with_line_number(true)
            .with_target(true);

        let file_filter = filter(&config.file_log_level, "info");
        if config.json_format {
            layers.push(file_layer.json().with_current_span(true).with_filter(file_filter).boxed());
        } else {
            layers.push(file_layer.with_filter(file_filter).boxed());
        }
    }

    if config.console_enabled {
        let console_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(true)
            .with_target(true)
            .with_filter(filter(&config.console_log_level, "warn"));
        layers.push(console_layer.boxed());
    }

    tracing_subscriber::registry()
        .with(layers)
        .try_init()
        .map_err(|e| GeneratorError::configuration(format!("Failed to install logging: {}", e)))?;

    info!(
        log_dir = ?config.log_dir,
        json_format = config.json_format,
        "Logging initialized"
    );

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}
