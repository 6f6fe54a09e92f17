//! The state threaded through every step of a computation.
//!
//! A [`State`] is replaced, never mutated: every operation consumes the old
//! value and returns the new one, so the branches of an alternative can both
//! start from the same snapshot without observing each other.

use super::error::{StepError, BREADCRUMB_SEPARATOR};
use super::log::{LogEntry, LogLevel};
use crate::config::Settings;
use chrono::{DateTime, Utc};
use std::any::Any;
use std::fmt;
use std::sync::Arc;
use uuid::Uuid;

/// Opaque handle to the externally driven resource.
///
/// The engine never creates or tears down the resource; it only carries the
/// handle from step to step. Steps needing mutation should put interior
/// mutability inside the handle.
#[derive(Clone)]
pub struct Session(Arc<dyn Any + Send + Sync>);

impl Session {
    pub fn new<T: Any + Send + Sync>(handle: T) -> Self {
        Self(Arc::new(handle))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Session(..)")
    }
}

/// Identity of one run, shared by every state of that run.
#[derive(Debug)]
struct RunScope {
    id: Uuid,
    started_at: DateTime<Utc>,
}

impl RunScope {
    fn new() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
        }
    }
}

/// Value + bookkeeping envelope passed through a computation.
#[derive(Clone, Debug)]
pub struct State {
    session: Option<Session>,
    context: Vec<String>,
    errors: Vec<StepError>,
    log: Vec<LogEntry>,
    settings: Settings,
    announced: Vec<String>,
    run: Arc<RunScope>,
}

impl Default for State {
    fn default() -> Self {
        Self::new(Settings::default())
    }
}

impl State {
    /// Create the empty state a run starts from.
    pub fn new(settings: Settings) -> Self {
        Self {
            session: None,
            context: Vec::new(),
            errors: Vec::new(),
            log: Vec::new(),
            settings,
            announced: Vec::new(),
            run: Arc::new(RunScope::new()),
        }
    }

    /// Typed access to the session handle, if one is installed.
    pub fn session<T: Any>(&self) -> Option<&T> {
        self.session.as_ref().and_then(|s| s.downcast_ref::<T>())
    }

    pub fn session_handle(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn with_session<T: Any + Send + Sync>(self, handle: T) -> Self {
        self.with_session_handle(Session::new(handle))
    }

    pub fn with_session_handle(mut self, session: Session) -> Self {
        self.session = Some(session);
        self
    }

    pub fn without_session(mut self) -> Self {
        self.session = None;
        self
    }

    /// Names of the enclosing scopes, outermost first.
    pub fn context(&self) -> &[String] {
        &self.context
    }

    pub fn errors(&self) -> &[StepError] {
        &self.errors
    }

    pub fn log(&self) -> &[LogEntry] {
        &self.log
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn run_id(&self) -> Uuid {
        self.run.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.run.started_at
    }

    pub fn is_faulted(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Append an error record.
    pub fn add_error(mut self, error: impl Into<StepError>) -> Self {
        self.errors.push(error.into());
        self
    }

    /// Replace the error sequence outright.
    pub fn with_errors(mut self, errors: Vec<StepError>) -> Self {
        self.errors = errors;
        self
    }

    /// Record a log entry at the current depth and publish it to subscribers.
    pub fn emit(self, level: LogLevel, message: impl Into<String>) -> Self {
        let depth = self.context.len();
        self.record(LogEntry::new(level, message, depth))
    }

    fn record(mut self, entry: LogEntry) -> Self {
        self.settings.log_stream().publish(&entry);
        self.log.push(entry);
        self
    }

    /// Enter a named scope; announces the scope path the first time this
    /// state's history enters it.
    ///
    /// Announcements travel with the state, so a discarded branch or attempt
    /// takes its announcements with it.
    pub(crate) fn push_scope(mut self, name: &str) -> Self {
        let depth = self.context.len();
        self.context.push(name.to_string());
        let path = self.context.join(BREADCRUMB_SEPARATOR);
        if self.announced.contains(&path) {
            return self;
        }
        self.announced.push(path.clone());
        self.record(LogEntry::new(LogLevel::Scope, path, depth))
    }

    /// Drop scopes back down to `depth`.
    pub(crate) fn truncate_scopes(mut self, depth: usize) -> Self {
        self.context.truncate(depth);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct FakeBrowser {
        url: String,
    }

    #[test]
    fn new_state_is_empty() {
        let state = State::default();
        assert!(state.context().is_empty());
        assert!(state.errors().is_empty());
        assert!(state.log().is_empty());
        assert!(state.session_handle().is_none());
        assert!(!state.is_faulted());
    }

    #[test]
    fn add_error_returns_new_state() {
        let state = State::default();
        let faulted = state.clone().add_error("boom");

        assert!(!state.is_faulted());
        assert!(faulted.is_faulted());
        assert_eq!(faulted.errors()[0].message(), "boom");
    }

    #[test]
    fn with_errors_replaces_sequence() {
        let state = State::default().add_error("a").add_error("b");
        let replaced = state.with_errors(vec![StepError::new("c")]);
        assert_eq!(replaced.errors().len(), 1);
        assert_eq!(replaced.errors()[0].message(), "c");
    }

    #[test]
    fn session_is_typed() {
        let state = State::default().with_session(FakeBrowser {
            url: "about:blank".to_string(),
        });
        assert_eq!(
            state.session::<FakeBrowser>().map(|b| b.url.as_str()),
            Some("about:blank")
        );
        assert!(state.session::<String>().is_none());
        assert!(state.without_session().session::<FakeBrowser>().is_none());
    }

    #[test]
    fn emit_uses_scope_depth() {
        let state = State::default()
            .emit(LogLevel::Info, "root")
            .push_scope("Chrome")
            .emit(LogLevel::Warn, "nested");

        let lines: Vec<String> = state.log().iter().map(LogEntry::render).collect();
        assert_eq!(lines, vec!["INFO: root", "Chrome", "  WARN: nested"]);
    }

    #[test]
    fn scope_is_announced_once_per_history() {
        let state = State::default()
            .push_scope("Chrome")
            .truncate_scopes(0)
            .push_scope("Chrome");
        assert_eq!(state.log().len(), 1);
        assert_eq!(state.context(), &["Chrome".to_string()]);
    }

    #[test]
    fn snapshot_does_not_see_later_announcements() {
        let snapshot = State::default();
        let _entered = snapshot.clone().push_scope("Tile");

        let again = snapshot.push_scope("Tile");
        let lines: Vec<String> = again.log().iter().map(LogEntry::render).collect();
        assert_eq!(lines, vec!["Tile"]);
    }

    #[test]
    fn clones_share_run_identity() {
        let state = State::default();
        let clone = state.clone().add_error("x");
        assert_eq!(state.run_id(), clone.run_id());
        assert_ne!(state.run_id(), State::default().run_id());
    }
}
