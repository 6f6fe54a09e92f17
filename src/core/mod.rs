//! The value model threaded through every computation.
//!
//! - [`State`]: session handle, scope stack, errors, log and settings
//! - [`Outcome`]: a state paired with an optional success value
//! - [`StepError`]: an accumulated failure record
//! - [`LogEntry`]: a leveled, depth-indented log line
//!
//! Everything here is plain data; running steps lives in `effects`.

mod error;
mod log;
mod outcome;
mod state;

pub use error::{ErrorKind, RunError, StepError, BREADCRUMB_SEPARATOR, NO_VALUE, TIMED_OUT};
pub use log::{LogEntry, LogLevel};
pub use outcome::Outcome;
pub use state::{Session, State};
