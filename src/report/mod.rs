//! Serializable summary of a finished run.
//!
//! A [`RunReport`] captures what a caller usually wants to keep after a run:
//! the errors with their breadcrumbs and the full log. The session handle and
//! the settings are not serializable and are left out.

use crate::core::{ErrorKind, LogEntry, State, StepError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub mod error;

pub use error::ReportError;

/// Version identifier for the report format
pub const REPORT_VERSION: u32 = 1;

/// One error record of a report.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub message: String,
    pub kind: ErrorKind,

    /// Scope path the error was tagged with, outermost first
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub breadcrumb: Option<Vec<String>>,
}

impl From<&StepError> for ErrorReport {
    fn from(error: &StepError) -> Self {
        Self {
            message: error.message().to_string(),
            kind: error.kind(),
            breadcrumb: error.breadcrumb().map(<[String]>::to_vec),
        }
    }
}

/// Serializable snapshot of a terminal state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RunReport {
    /// Report format version
    pub version: u32,

    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// Scope stack at the time of the snapshot; empty for a terminal state
    pub context: Vec<String>,

    pub errors: Vec<ErrorReport>,
    pub log: Vec<LogEntry>,
}

impl RunReport {
    pub fn from_state(state: &State) -> Self {
        Self {
            version: REPORT_VERSION,
            run_id: state.run_id(),
            started_at: state.started_at(),
            finished_at: Utc::now(),
            context: state.context().to_vec(),
            errors: state.errors().iter().map(ErrorReport::from).collect(),
            log: state.log().to_vec(),
        }
    }

    pub fn is_faulted(&self) -> bool {
        !self.errors.is_empty()
    }

    /// The log rendered as indented lines.
    pub fn lines(&self) -> Vec<String> {
        self.log.iter().map(LogEntry::render).collect()
    }

    pub fn to_json(&self) -> Result<String, ReportError> {
        serde_json::to_string_pretty(self).map_err(ReportError::Render)
    }

    pub fn from_json(json: &str) -> Result<Self, ReportError> {
        let report: Self = serde_json::from_str(json).map_err(ReportError::Malformed)?;
        if report.version != REPORT_VERSION {
            return Err(ReportError::UnsupportedVersion {
                found: report.version,
                supported: REPORT_VERSION,
            });
        }
        Ok(report)
    }
}

impl State {
    /// Snapshot this state as a [`RunReport`].
    pub fn report(&self) -> RunReport {
        RunReport::from_state(self)
    }
}
