//! Tagged console logging for tokenscope.
//!
//! Level filtering is global and set once at startup from the command-line
//! flags. Errors and warnings go to stderr, everything else to stdout.

use chrono::Utc;
use colored::Colorize;
use std::sync::atomic::{AtomicU8, Ordering};

/// Standard log levels, most severe first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Info = 2,
    Debug = 3,
}

/// Subsystem tag shown in brackets on every line.
#[derive(Debug, Clone, Copy)]
pub enum LogTag {
    System,
    Api,
    Cache,
    Tokens,
    Aggregator,
    Refresh,
    Events,
}

impl LogTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogTag::System => "SYSTEM",
            LogTag::Api => "API",
            LogTag::Cache => "CACHE",
            LogTag::Tokens => "TOKENS",
            LogTag::Aggregator => "AGGREGATOR",
            LogTag::Refresh => "REFRESH",
            LogTag::Events => "EVENTS",
        }
    }
}

static MAX_LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Info as u8);

/// Set the global log level. Call once at startup before any logging.
pub fn init(level: LogLevel) {
    MAX_LEVEL.store(level as u8, Ordering::Relaxed);
}

fn log_internal(tag: LogTag, level: LogLevel, message: &str) {
    if (level as u8) > MAX_LEVEL.load(Ordering::Relaxed) {
        return;
    }

    let timestamp = Utc::now().format("%H:%M:%S%.3f").to_string();
    let tag_label = format!("[{}]", tag.as_str());
    let label = match level {
        LogLevel::Error => "ERROR".red().bold(),
        LogLevel::Warning => "WARN ".yellow(),
        LogLevel::Info => "INFO ".green(),
        LogLevel::Debug => "DEBUG".dimmed(),
    };
    let line = format!(
        "{} {} {} {}",
        timestamp.as_str().dimmed(),
        label,
        tag_label.as_str().cyan(),
        message
    );

    match level {
        LogLevel::Error | LogLevel::Warning => eprintln!("{}", line),
        _ => println!("{}", line),
    }
}

/// Log at ERROR level (always shown, critical issues).
pub fn error(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Error, message);
}

/// Log at WARNING level (important issues that don't stop the service).
pub fn warning(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Warning, message);
}

/// Log at INFO level (normal operation).
pub fn info(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Info, message);
}

/// Log at DEBUG level (only shown with --debug).
pub fn debug(tag: LogTag, message: &str) {
    log_internal(tag, LogLevel::Debug, message);
}
