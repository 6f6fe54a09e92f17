//! Error records accumulated by computations.
//!
//! A [`StepError`] is a value, not a control-flow mechanism: failed steps
//! append records to the state and the chain short-circuits, but nothing is
//! thrown. Only [`RunError`] leaves the engine as a Rust error.

use super::state::State;
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use stillwater::NonEmptyVec;
use thiserror::Error;

/// Separator used when joining scope names into a breadcrumb.
pub const BREADCRUMB_SEPARATOR: &str = " → ";

/// Message of the error appended when a poll exhausts its wait budget.
pub const TIMED_OUT: &str = "Timed out";

/// Message of the error recorded for an outcome left with neither a value
/// nor an error.
pub const NO_VALUE: &str = "step produced no value";

/// How an error record came to exist.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// A step panicked or returned an `Err`.
    Raised,

    /// A step or combinator deliberately failed.
    Explicit,

    /// A poll ran out of time.
    TimedOut,
}

/// A single accumulated failure.
#[derive(Clone)]
pub struct StepError {
    message: String,
    kind: ErrorKind,
    source: Option<Arc<dyn Error + Send + Sync>>,
    breadcrumb: Option<Vec<String>>,
}

impl StepError {
    /// Create an explicit failure with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            kind: ErrorKind::Explicit,
            source: None,
            breadcrumb: None,
        }
    }

    /// Wrap an error returned by a step, keeping it as the source.
    pub fn raised<E>(error: E) -> Self
    where
        E: Into<Box<dyn Error + Send + Sync>>,
    {
        let source: Arc<dyn Error + Send + Sync> = Arc::from(error.into());
        Self {
            message: source.to_string(),
            kind: ErrorKind::Raised,
            source: Some(source),
            breadcrumb: None,
        }
    }

    /// Translate a caught panic payload into an error record.
    pub fn from_panic(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(text) = payload.downcast_ref::<&str>() {
            (*text).to_string()
        } else if let Some(text) = payload.downcast_ref::<String>() {
            text.clone()
        } else {
            "step panicked".to_string()
        };
        tracing::warn!(%message, "caught panic at computation boundary");
        Self {
            message,
            kind: ErrorKind::Raised,
            source: None,
            breadcrumb: None,
        }
    }

    /// The error appended when a poll gives up.
    pub fn timed_out() -> Self {
        Self {
            message: TIMED_OUT.to_string(),
            kind: ErrorKind::TimedOut,
            source: None,
            breadcrumb: None,
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Scope names (outermost first) the error was tagged with, if any.
    pub fn breadcrumb(&self) -> Option<&[String]> {
        self.breadcrumb.as_deref()
    }

    pub fn is_tagged(&self) -> bool {
        self.breadcrumb.is_some()
    }

    /// Append the breadcrumb to the message and remember the scopes.
    ///
    /// An already tagged error is returned unchanged, so the innermost scope
    /// always wins.
    pub fn tagged(mut self, scopes: &[String]) -> Self {
        if self.breadcrumb.is_some() || scopes.is_empty() {
            return self;
        }
        self.message = format!(
            "{} ({})",
            self.message,
            scopes.join(BREADCRUMB_SEPARATOR)
        );
        self.breadcrumb = Some(scopes.to_vec());
        self
    }
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StepError")
            .field("message", &self.message)
            .field("kind", &self.kind)
            .field("source", &self.source.as_ref().map(|s| s.to_string()))
            .field("breadcrumb", &self.breadcrumb)
            .finish()
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        self.source
            .as_ref()
            .map(|source| source.as_ref() as &(dyn Error + 'static))
    }
}

impl PartialEq for StepError {
    fn eq(&self, other: &Self) -> bool {
        self.message == other.message
            && self.kind == other.kind
            && self.breadcrumb == other.breadcrumb
    }
}

impl From<&str> for StepError {
    fn from(message: &str) -> Self {
        Self::new(message)
    }
}

impl From<String> for StepError {
    fn from(message: String) -> Self {
        Self::new(message)
    }
}

/// Failure reported by `try_run` when the terminal state is faulted.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("{}", summarize(.errors))]
    Faulted {
        errors: NonEmptyVec<StepError>,
        state: Box<State>,
    },
}

impl RunError {
    /// Every error of the terminal state, in order.
    pub fn errors(&self) -> &NonEmptyVec<StepError> {
        match self {
            Self::Faulted { errors, .. } => errors,
        }
    }

    /// The terminal state of the failed run.
    pub fn state(&self) -> &State {
        match self {
            Self::Faulted { state, .. } => state,
        }
    }
}

fn summarize(errors: &NonEmptyVec<StepError>) -> String {
    match errors.len() {
        1 => errors.head().to_string(),
        n => format!("{} (and {} more)", errors.head(), n - 1),
    }
}
