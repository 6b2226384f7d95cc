//! Structured logging for the packet loss tester
//!
//! This module provides:
//! - Structured logging with levels, shared context and session ids
//! - Console, JSON and compact output formats
//! - Per-attempt progress lines (`[n/N] <ms> ms | <status> | <detail>`)
//! - Run lifecycle and error event logging

use crate::error::{AppError, Result};
use crate::models::{AttemptRecord, Config};
use crate::stats::SummaryStats;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Log level enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LogLevel {
    Trace = 0,
    Debug = 1,
    Info = 2,
    Warn = 3,
    Error = 4,
    Fatal = 5,
}

impl LogLevel {
    /// Get log level name as string
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "TRACE",
            LogLevel::Debug => "DEBUG",
            LogLevel::Info => "INFO",
            LogLevel::Warn => "WARN",
            LogLevel::Error => "ERROR",
            LogLevel::Fatal => "FATAL",
        }
    }

    /// Get ANSI color code for console output
    pub fn color_code(&self) -> &'static str {
        match self {
            LogLevel::Trace => "\x1b[37m",
            LogLevel::Debug => "\x1b[36m",
            LogLevel::Info => "\x1b[32m",
            LogLevel::Warn => "\x1b[33m",
            LogLevel::Error => "\x1b[31m",
            LogLevel::Fatal => "\x1b[35m",
        }
    }

    pub fn reset_code() -> &'static str {
        "\x1b[0m"
    }
}

impl std::str::FromStr for LogLevel {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_uppercase().as_str() {
            "TRACE" => Ok(LogLevel::Trace),
            "DEBUG" => Ok(LogLevel::Debug),
            "INFO" => Ok(LogLevel::Info),
            "WARN" | "WARNING" => Ok(LogLevel::Warn),
            "ERROR" => Ok(LogLevel::Error),
            "FATAL" => Ok(LogLevel::Fatal),
            _ => Err(AppError::parse(format!("Invalid log level: {}", s))),
        }
    }
}

/// Log entry structure for structured logging
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    /// Logger name/component
    pub logger: String,
    /// Correlation ID for tracking related events
    pub correlation_id: Option<String>,
    /// Structured fields, ordered by key
    pub fields: BTreeMap<String, serde_json::Value>,
    pub location: Option<LogLocation>,
}

/// Source code location information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogLocation {
    pub file: String,
    pub line: u32,
    pub module: Option<String>,
}

/// Log output format options
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogFormat {
    /// Human-readable console format
    Console,
    /// One JSON object per line
    Json,
    /// Compact single-line format
    Compact,
}

/// Shared logging context
#[derive(Debug, Default)]
struct LogContext {
    session_id: Option<String>,
    context_fields: BTreeMap<String, serde_json::Value>,
}

/// Logger with configurable level, format and shared context
pub struct Logger {
    min_level: LogLevel,
    use_color: bool,
    include_location: bool,
    format: LogFormat,
    name: String,
    context: Arc<RwLock<LogContext>>,
}

impl Logger {
    /// Create a new logger at Info level
    pub fn new(name: String) -> Self {
        Self {
            min_level: LogLevel::Info,
            use_color: true,
            include_location: false,
            format: LogFormat::Console,
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    /// Create a logger whose level and format follow the configuration
    ///
    /// `debug` selects Debug level with JSON output and source locations,
    /// `verbose` selects Info, anything else Warn.
    pub fn with_config(name: String, config: &Config) -> Self {
        let min_level = if config.debug {
            LogLevel::Debug
        } else if config.verbose {
            LogLevel::Info
        } else {
            LogLevel::Warn
        };

        Self {
            min_level,
            use_color: config.enable_color,
            include_location: config.debug,
            format: if config.debug { LogFormat::Json } else { LogFormat::Console },
            name,
            context: Arc::new(RwLock::new(LogContext::default())),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn set_level(&mut self, level: LogLevel) {
        self.min_level = level;
    }

    pub fn set_format(&mut self, format: LogFormat) {
        self.format = format;
    }

    pub fn set_color(&mut self, use_color: bool) {
        self.use_color = use_color;
    }

    /// Set session correlation ID
    pub async fn set_session_id(&self, session_id: String) {
        let mut context = self.context.write().await;
        context.session_id = Some(session_id);
    }

    /// Add context field for all subsequent log entries
    pub async fn add_context_field<T: Serialize>(&self, key: String, value: T) {
        if let Ok(json_value) = serde_json::to_value(value) {
            let mut context = self.context.write().await;
            context.context_fields.insert(key, json_value);
        }
    }

    /// Create a log entry builder
    pub fn log(&self, level: LogLevel, message: &str) -> LogEntryBuilder<'_> {
        LogEntryBuilder::new(self, level, message.to_string())
    }

    pub fn trace(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Trace, message)
    }

    pub fn debug(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Debug, message)
    }

    pub fn info(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Info, message)
    }

    pub fn warn(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Warn, message)
    }

    pub fn error(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Error, message)
    }

    pub fn fatal(&self, message: &str) -> LogEntryBuilder<'_> {
        self.log(LogLevel::Fatal, message)
    }

    /// Check if a log level would be output
    pub fn would_log(&self, level: LogLevel) -> bool {
        level >= self.min_level
    }

    /// Render an entry with context applied, or `None` when filtered out
    async fn render(&self, mut entry: LogEntry) -> Option<(LogLevel, String)> {
        if !self.would_log(entry.level) {
            return None;
        }

        let context = self.context.read().await;
        if let Some(session_id) = &context.session_id {
            entry
                .fields
                .insert("session_id".to_string(), serde_json::Value::String(session_id.clone()));
        }
        for (key, value) in &context.context_fields {
            entry.fields.entry(key.clone()).or_insert_with(|| value.clone());
        }
        drop(context);

        let output = match self.format {
            LogFormat::Console => self.format_console(&entry),
            LogFormat::Json => self.format_json(&entry),
            LogFormat::Compact => self.format_compact(&entry),
        };

        Some((entry.level, output))
    }

    async fn write_entry(&self, entry: LogEntry) {
        if let Some((level, output)) = self.render(entry).await {
            // Warnings and above go to stderr
            if level >= LogLevel::Warn {
                let _ = writeln!(io::stderr(), "{}", output);
            } else {
                let _ = writeln!(io::stdout(), "{}", output);
            }
        }
    }

    fn format_console(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%Y-%m-%d %H:%M:%S%.3f");
        let level_str = entry.level.as_str();

        let formatted_level = if self.use_color {
            format!("{}{:>5}{}", entry.level.color_code(), level_str, LogLevel::reset_code())
        } else {
            format!("{:>5}", level_str)
        };

        let mut output = format!("{} {} [{}] {}", timestamp, formatted_level, entry.logger, entry.message);

        if let Some(correlation_id) = &entry.correlation_id {
            let short: String = correlation_id.chars().take(8).collect();
            output.push_str(&format!(" [{}]", short));
        }

        // Session id is noise on a terminal
        let fields: Vec<String> = entry
            .fields
            .iter()
            .filter(|(k, _)| k.as_str() != "session_id")
            .map(|(k, v)| format!("{}={}", k, v))
            .collect();
        if !fields.is_empty() {
            output.push_str(&format!(" {{{}}}", fields.join(", ")));
        }

        if self.include_location {
            if let Some(location) = &entry.location {
                output.push_str(&format!(" @ {}:{}", location.file, location.line));
            }
        }

        output
    }

    fn format_json(&self, entry: &LogEntry) -> String {
        match serde_json::to_string(entry) {
            Ok(json) => json,
            Err(_) => serde_json::json!({
                "error": "Failed to serialize log entry",
                "message": entry.message,
            })
            .to_string(),
        }
    }

    fn format_compact(&self, entry: &LogEntry) -> String {
        let timestamp = entry.timestamp.format("%H:%M:%S");
        format!(
            "{} {} {}: {}",
            timestamp,
            entry.level.as_str().chars().next().unwrap_or('?'),
            entry.logger,
            entry.message
        )
    }
}

/// Builder for log entries
pub struct LogEntryBuilder<'a> {
    logger: &'a Logger,
    entry: LogEntry,
}

impl<'a> LogEntryBuilder<'a> {
    fn new(logger: &'a Logger, level: LogLevel, message: String) -> Self {
        Self {
            logger,
            entry: LogEntry {
                timestamp: Utc::now(),
                level,
                message,
                logger: logger.name.clone(),
                correlation_id: None,
                fields: BTreeMap::new(),
                location: None,
            },
        }
    }

    pub fn correlation_id(mut self, id: &str) -> Self {
        self.entry.correlation_id = Some(id.to_string());
        self
    }

    /// Add a structured field
    pub fn field<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(json_value) = serde_json::to_value(value) {
            self.entry.fields.insert(key.to_string(), json_value);
        }
        self
    }

    pub fn location(mut self, file: &str, line: u32, module: Option<&str>) -> Self {
        self.entry.location = Some(LogLocation {
            file: file.to_string(),
            line,
            module: module.map(String::from),
        });
        self
    }

    /// Attach the fields of an attempt record
    pub fn attempt(self, record: &AttemptRecord) -> Self {
        self.field("attempt", record.attempt_number)
            .field("status", record.status.label())
            .field("elapsed_ms", record.elapsed_ms)
            .field("retry_count", record.retry_count)
    }

    /// Add error information
    pub fn error_info(self, error: &AppError) -> Self {
        self.field("error_category", error.category())
            .field("error_recoverable", error.is_recoverable())
            .field("error_exit_code", error.exit_code())
    }

    /// Finalize and write the log entry
    pub async fn log(self) {
        self.logger.write_entry(self.entry).await;
    }

    #[cfg(test)]
    async fn render(self) -> Option<String> {
        self.logger.render(self.entry).await.map(|(_, output)| output)
    }
}

/// Per-attempt progress logger
///
/// Successful attempts are logged at Info, everything else at Warn, so the
/// default (non-verbose) level shows failures only.
pub struct AttemptLogger {
    logger: Logger,
    total: u32,
}

impl AttemptLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("ATTEMPT".to_string(), config),
            total: config.num_tests,
        }
    }

    /// `[n/N] <ms> ms | <status> | <detail>`
    pub fn format_progress(record: &AttemptRecord, total: u32) -> String {
        let elapsed = match record.elapsed_ms {
            Some(ms) => format!("{:.2} ms", ms),
            None => "-- ms".to_string(),
        };

        let mut line = format!(
            "[{}/{}] {} | {} | {}",
            record.attempt_number,
            total,
            elapsed,
            record.status.label(),
            record.detail
        );

        if record.retry_count > 0 {
            line.push_str(&format!(" | retries={}", record.retry_count));
        }

        line
    }

    pub async fn log_attempt(&self, record: &AttemptRecord) {
        let level = if record.is_success() { LogLevel::Info } else { LogLevel::Warn };
        let message = Self::format_progress(record, self.total);

        self.logger.log(level, &message).attempt(record).log().await;
    }
}

/// Run lifecycle logger
pub struct RunLogger {
    logger: Logger,
}

impl RunLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("RUN".to_string(), config),
        }
    }

    /// Log the start of a run, returning its correlation id
    pub async fn log_run_start(&self, config: &Config) -> String {
        let correlation_id = Uuid::new_v4().to_string();

        self.logger
            .info(&format!(
                "Starting {} {} run: {} attempts against {}",
                config.concurrency_mode,
                config.protocol_mode,
                config.num_tests,
                config.target_description()
            ))
            .correlation_id(&correlation_id)
            .field("target", config.target_description())
            .field("protocol", config.protocol_mode)
            .field("concurrency", config.concurrency_mode)
            .field("num_tests", config.num_tests)
            .field("timeout_seconds", config.timeout_seconds)
            .field("dynamic_port_check", config.dynamic_port_check)
            .log()
            .await;

        correlation_id
    }

    pub async fn log_run_complete(&self, stats: &SummaryStats, correlation_id: &str) {
        let level = if stats.loss_count == 0 { LogLevel::Info } else { LogLevel::Warn };

        self.logger
            .log(
                level,
                &format!(
                    "Run complete: {}/{} succeeded, {:.2}% loss in {:.2}s",
                    stats.success_count, stats.num_tests, stats.loss_percentage, stats.duration_seconds
                ),
            )
            .correlation_id(correlation_id)
            .field("success_count", stats.success_count)
            .field("loss_count", stats.loss_count)
            .field("loss_percentage", stats.loss_percentage)
            .field("success_rate", stats.success_rate())
            .field("mean_ms", stats.latency.as_ref().map(|l| l.mean_ms))
            .field("total_retries", stats.total_retries)
            .field("inversions", stats.ordering.as_ref().map(|o| o.inversions))
            .log()
            .await;
    }
}

/// Error event logger
pub struct ErrorEventLogger {
    logger: Logger,
}

impl ErrorEventLogger {
    pub fn new(config: &Config) -> Self {
        Self {
            logger: Logger::with_config("ERR".to_string(), config),
        }
    }

    /// Log an application error with context
    pub async fn log_error(&self, error: &AppError, context: Option<&str>) {
        let message = match context {
            Some(ctx) => format!("{}: {}", ctx, error),
            None => error.to_string(),
        };

        let mut builder = self.logger.error(&message).error_info(error);
        if let Some(ctx) = context {
            builder = builder.field("context", ctx);
        }

        builder.log().await;
    }

    /// Log an attempt task that ended without reporting its record
    pub async fn log_lost_attempt(&self, attempt_number: u32, reason: &str) {
        self.logger
            .error(&format!("Attempt {} did not report: {}", attempt_number, reason))
            .field("attempt", attempt_number)
            .field("reason", reason)
            .log()
            .await;
    }
}

/// Creates loggers that share one session id
pub struct LoggerFactory {
    config: Config,
    session_id: String,
}

impl LoggerFactory {
    pub fn new(config: Config) -> Self {
        Self {
            config,
            session_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create a logger with a specific name
    pub async fn create_logger(&self, name: &str) -> Logger {
        let logger = Logger::with_config(name.to_string(), &self.config);
        logger.set_session_id(self.session_id.clone()).await;
        logger
    }

    pub async fn create_attempt_logger(&self) -> AttemptLogger {
        let attempt_logger = AttemptLogger::new(&self.config);
        attempt_logger.logger.set_session_id(self.session_id.clone()).await;
        attempt_logger
    }

    pub async fn create_run_logger(&self) -> RunLogger {
        let run_logger = RunLogger::new(&self.config);
        run_logger.logger.set_session_id(self.session_id.clone()).await;
        run_logger
    }

    pub async fn create_error_logger(&self) -> ErrorEventLogger {
        let err_logger = ErrorEventLogger::new(&self.config);
        err_logger.logger.set_session_id(self.session_id.clone()).await;
        err_logger
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }
}

/// Convenience macros for logging with location information
#[macro_export]
macro_rules! log_debug {
    ($logger:expr, $($arg:tt)*) => {
        $logger.debug(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_info {
    ($logger:expr, $($arg:tt)*) => {
        $logger.info(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}

#[macro_export]
macro_rules! log_warn {
    ($logger:expr, $($arg:tt)*) => {
        $logger.warn(&format!($($arg)*))
            .location(file!(), line!(), Some(module_path!()))
            .log()
            .await
    };
}
