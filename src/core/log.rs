//! Structured log entries recorded during a run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a log entry.
///
/// `Scope` marks the line emitted when a context scope is first entered;
/// it renders without a level prefix.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Scope,
    Info,
    Warn,
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Scope => "SCOPE",
            Self::Info => "INFO",
            Self::Warn => "WARN",
        };
        f.write_str(label)
    }
}

/// One entry of the run log.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Number of enclosing context scopes when the entry was emitted.
    pub depth: usize,
    pub timestamp: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>, depth: usize) -> Self {
        Self {
            level,
            message: message.into(),
            depth,
            timestamp: Utc::now(),
        }
    }

    /// Render as a single line, indented two spaces per depth level.
    ///
    /// ```rust
    /// use stepwise::core::{LogEntry, LogLevel};
    ///
    /// let entry = LogEntry::new(LogLevel::Warn, "slow page", 2);
    /// assert_eq!(entry.render(), "    WARN: slow page");
    ///
    /// let scope = LogEntry::new(LogLevel::Scope, "Chrome → Start Page", 1);
    /// assert_eq!(scope.render(), "  Chrome → Start Page");
    /// ```
    pub fn render(&self) -> String {
        let indent = "  ".repeat(self.depth);
        match self.level {
            LogLevel::Scope => format!("{indent}{}", self.message),
            level => format!("{indent}{level}: {}", self.message),
        }
    }
}
