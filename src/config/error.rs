//! Configuration errors.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while loading or reading settings
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("Failed to parse settings: {0}")]
    Parse(String),

    #[error("Poll interval must be greater than zero")]
    ZeroInterval,

    #[error("Wait budget must be greater than zero")]
    ZeroBudget,

    #[error("Wait budget ({budget:?}) is shorter than the poll interval ({interval:?})")]
    BudgetShorterThanInterval { budget: Duration, interval: Duration },

    #[error("Parameter '{key}' has an unexpected shape: {message}")]
    InvalidParam { key: String, message: String },
}
