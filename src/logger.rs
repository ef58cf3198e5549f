/// Fixer logger with tag-based colored console output
///
/// Console logging with fixed-width tags and a global verbosity level.
/// The level is set once at startup from the CLI flags and read lock-free
/// on every log call.
///
/// ## Usage:
/// ```rust
/// use poefixer::logger::{self, LogTag};
///
/// logger::set_level(logger::LogLevel::Info);
/// logger::info(LogTag::System, "Processor started");
/// logger::debug(LogTag::Database, "SELECT 1");
/// ```

use std::sync::atomic::{ AtomicU8, Ordering };

use chrono::Local;
use colored::*;

/// Set to false to hide time in logs
const LOG_SHOW_TIME: bool = true;

/// Fixed tag column width for aligned output
const TAG_WIDTH: usize = 8;

/// Global verbosity level, stored as a u8 for atomic access
static LEVEL: AtomicU8 = AtomicU8::new(LogLevel::Warn as u8);

/// Verbosity levels, ordered from quietest to noisiest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u8)]
pub enum LogLevel {
    Error = 0,
    Warn = 1,
    Info = 2,
    Debug = 3,
    Trace = 4,
}

/// Log tags for categorizing log messages.
#[derive(Debug, Clone)]
pub enum LogTag {
    System,
    Database,
    Api,
    Ingest,
    Currency,
}

/// Set the global verbosity level (call once at startup)
pub fn set_level(level: LogLevel) {
    LEVEL.store(level as u8, Ordering::Relaxed);
}

/// Current global verbosity level
pub fn level() -> LogLevel {
    match LEVEL.load(Ordering::Relaxed) {
        0 => LogLevel::Error,
        1 => LogLevel::Warn,
        2 => LogLevel::Info,
        3 => LogLevel::Debug,
        _ => LogLevel::Trace,
    }
}

/// Whether messages at `level` are currently emitted
pub fn enabled(level: LogLevel) -> bool {
    level <= self::level()
}

pub fn error(tag: LogTag, message: &str) {
    log(tag, LogLevel::Error, message);
}

pub fn warn(tag: LogTag, message: &str) {
    log(tag, LogLevel::Warn, message);
}

pub fn info(tag: LogTag, message: &str) {
    log(tag, LogLevel::Info, message);
}

pub fn debug(tag: LogTag, message: &str) {
    log(tag, LogLevel::Debug, message);
}

pub fn trace(tag: LogTag, message: &str) {
    log(tag, LogLevel::Trace, message);
}

/// Logs a message with time, tag, level, and message.
fn log(tag: LogTag, level: LogLevel, message: &str) {
    if !enabled(level) {
        return;
    }

    let prefix = if LOG_SHOW_TIME {
        format!("{} ", Local::now().format("%H:%M:%S"))
            .dimmed()
            .to_string()
    } else {
        String::new()
    };

    // Fixed-width log tag
    let tag_str = match tag {
        LogTag::System =>
            format!("{:<width$}", "SYSTEM", width = TAG_WIDTH)
                .bright_yellow()
                .bold(),
        LogTag::Database =>
            format!("{:<width$}", "DATABASE", width = TAG_WIDTH)
                .bright_blue()
                .bold(),
        LogTag::Api =>
            format!("{:<width$}", "API", width = TAG_WIDTH)
                .bright_purple()
                .bold(),
        LogTag::Ingest =>
            format!("{:<width$}", "INGEST", width = TAG_WIDTH)
                .bright_cyan()
                .bold(),
        LogTag::Currency =>
            format!("{:<width$}", "CURRENCY", width = TAG_WIDTH)
                .bright_green()
                .bold(),
    };

    let level_str = match level {
        LogLevel::Error => format!("{:<5}", "ERROR").bright_red().bold(),
        LogLevel::Warn => format!("{:<5}", "WARN").yellow().bold(),
        LogLevel::Info => format!("{:<5}", "INFO").bright_white(),
        LogLevel::Debug => format!("{:<5}", "DEBUG").dimmed(),
        LogLevel::Trace => format!("{:<5}", "TRACE").dimmed(),
    };

    let line = format!("{}[{}] [{}] {}", prefix, tag_str, level_str, message);
    if level <= LogLevel::Warn {
        eprintln!("{}", line);
    } else {
        println!("{}", line);
    }
}
