//! Run logging.
//!
//! Log entries are recorded in the state (so the terminal state carries the
//! full log) and published live to the [`LogStream`] of the run's settings,
//! whether or not the run ends up faulted.

mod stream;

pub use stream::{LogCollector, LogStream};

use crate::core::{LogLevel, Outcome};
use crate::effects::Flow;

/// Step that records `message` at `level` and succeeds with `()`.
pub fn log<Env>(level: LogLevel, message: impl Into<String>) -> Flow<(), Env>
where
    Env: Clone + Send + Sync + 'static,
{
    let message = message.into();
    Flow::new(move |_env: &Env, state| Outcome::success(state.clone().emit(level, message.as_str()), ()))
}

/// Step that records an info entry.
pub fn info<Env>(message: impl Into<String>) -> Flow<(), Env>
where
    Env: Clone + Send + Sync + 'static,
{
    log(LogLevel::Info, message)
}

/// Step that records a warning entry.
pub fn warn<Env>(message: impl Into<String>) -> Flow<(), Env>
where
    Env: Clone + Send + Sync + 'static,
{
    log(LogLevel::Warn, message)
}
