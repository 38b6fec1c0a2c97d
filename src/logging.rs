/// Structured logging for the pond profile service
///
/// Provides context-rich logging tagged with the pipeline stage and an
/// optional site or file identifier. Supports console output and an
/// optional append-only log file for batch runs.

use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::fs::OpenOptions;
use std::io::Write;
use std::str::FromStr;
use std::sync::Mutex;

use crate::model::RecordFault;

// ---------------------------------------------------------------------------
// Log Levels
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Debug,
    Info,
    Warning,
    Error,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LogLevel::Debug => write!(f, "DEBUG"),
            LogLevel::Info => write!(f, "INFO"),
            LogLevel::Warning => write!(f, "WARN"),
            LogLevel::Error => write!(f, "ERROR"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{}'", other)),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline Stages
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Loader,
    Resolver,
    Aggregator,
    Query,
    System,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Loader => write!(f, "LOAD"),
            Stage::Resolver => write!(f, "SITE"),
            Stage::Aggregator => write!(f, "PROF"),
            Stage::Query => write!(f, "QRY"),
            Stage::System => write!(f, "SYS"),
        }
    }
}

// ---------------------------------------------------------------------------
// Logger Configuration
// ---------------------------------------------------------------------------

/// Global logger instance. Calls made before `init_logger` are dropped.
static LOGGER: Mutex<Option<Logger>> = Mutex::new(None);

pub struct Logger {
    /// Minimum log level to display
    min_level: LogLevel,
    /// Optional file path for logging
    log_file: Option<String>,
    /// Whether to include timestamps in console output
    console_timestamps: bool,
}

impl Logger {
    pub fn init(min_level: LogLevel, log_file: Option<String>, console_timestamps: bool) {
        let logger = Logger {
            min_level,
            log_file,
            console_timestamps,
        };

        let mut slot = LOGGER.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        *slot = Some(logger);
    }

    fn format_entry(level: LogLevel, stage: &Stage, context: Option<&str>, message: &str) -> String {
        let timestamp = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
        let context_part = context.map(|s| format!(" [{}]", s)).unwrap_or_default();
        format!("{} {} {}{}: {}", timestamp, level, stage, context_part, message)
    }

    fn log(&self, level: LogLevel, stage: &Stage, context: Option<&str>, message: &str) {
        if level < self.min_level {
            return;
        }

        // Console output goes to stderr only; stdout belongs to the batch JSON.
        let stderr = std::io::stderr();
        let log_entry = self.write_console(&mut stderr.lock(), level, stage, context, message);

        // File output
        if let Some(ref path) = self.log_file {
            if let Err(e) = Self::append_to_file(path, &log_entry) {
                eprintln!("Failed to write to log file {}: {}", path, e);
            }
        }
    }

    /// Writes one console line to `console` and returns the full file entry.
    fn write_console(
        &self,
        console: &mut impl Write,
        level: LogLevel,
        stage: &Stage,
        context: Option<&str>,
        message: &str,
    ) -> String {
        let log_entry = Self::format_entry(level, stage, context, message);
        let context_part = context.map(|s| format!(" [{}]", s)).unwrap_or_default();

        let line = if self.console_timestamps {
            log_entry.clone()
        } else {
            match level {
                LogLevel::Error => format!("   ✗ {}{}: {}", stage, context_part, message),
                LogLevel::Warning => format!("   ⚠ {}{}: {}", stage, context_part, message),
                LogLevel::Info => format!("   {}", message),
                LogLevel::Debug => format!("   [DEBUG] {}{}: {}", stage, context_part, message),
            }
        };
        // Console write failures are ignored.
        let _ = writeln!(console, "{}", line);

        log_entry
    }

    fn append_to_file(path: &str, entry: &str) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        writeln!(file, "{}", entry)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Public Logging Functions
// ---------------------------------------------------------------------------

/// Initialize the global logger
pub fn init_logger(min_level: LogLevel, log_file: Option<&str>, console_timestamps: bool) {
    Logger::init(min_level, log_file.map(String::from), console_timestamps);
}

fn dispatch(level: LogLevel, stage: Stage, context: Option<&str>, message: &str) {
    if let Ok(guard) = LOGGER.lock() {
        if let Some(logger) = guard.as_ref() {
            logger.log(level, &stage, context, message);
        }
    }
}

pub fn info(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Info, stage, context, message);
}

pub fn warn(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Warning, stage, context, message);
}

pub fn error(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Error, stage, context, message);
}

pub fn debug(stage: Stage, context: Option<&str>, message: &str) {
    dispatch(LogLevel::Debug, stage, context, message);
}

// ---------------------------------------------------------------------------
// Load Summary Logging
// ---------------------------------------------------------------------------

/// Log the outcome of a raw-data load.
///
/// Clean loads are info, loads that dropped rows are warnings, and a load
/// that produced no readings at all is an error.
pub fn log_load_summary(files: usize, readings: usize, dropped: usize) {
    let message = format!(
        "Load complete: {} readings from {} file(s), {} row(s) dropped",
        readings, files, dropped
    );

    if readings == 0 {
        error(Stage::Loader, None, &message);
    } else if dropped > 0 {
        warn(Stage::Loader, None, &message);
    } else {
        info(Stage::Loader, None, &message);
    }
}

/// Log one debug line per drop reason, for diagnosing messy exports.
pub fn log_drop_reasons(context: Option<&str>, reasons: &BTreeMap<RecordFault, usize>) {
    for (fault, count) in reasons {
        debug(Stage::Loader, context, &format!("{} row(s) dropped: {}", count, fault));
    }
}
