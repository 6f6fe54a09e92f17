//! Stepwise: composable steps for driving an external session
//!
//! Stepwise describes a run against an externally driven resource (a
//! browser, a device, a remote shell) as a chain of small steps. Each step
//! receives the current [`State`](core::State), does its work and hands back
//! a new state with either a value or a recorded error. Failures never
//! unwind: they accumulate in the state, get tagged with the scopes they
//! happened in, and stop the rest of the chain.
//!
//! # Core Concepts
//!
//! - **State**: session handle, scope stack, errors, log and settings
//! - **Flow / AsyncFlow**: immutable step descriptions, run on demand
//! - **Combinators**: alternative, named context, poll-until
//! - **Log stream**: every log entry is published live to subscribers
//!
//! # Example
//!
//! ```rust
//! use stepwise::config::Settings;
//! use stepwise::effects::{context, fail, Flow};
//! use stepwise::logging::info;
//!
//! let flow: Flow<()> = info("Opening browser").and_then(|_| {
//!     context("Chrome", context("Start Page", fail("element not found")))
//! });
//!
//! let outcome = flow.run(Settings::default());
//! assert!(outcome.is_faulted());
//! assert_eq!(
//!     outcome.state().errors()[0].message(),
//!     "element not found (Chrome → Start Page)"
//! );
//! ```

pub mod config;
pub mod core;
pub mod effects;
pub mod logging;
pub mod report;

mod macros;

// Re-export commonly used types
pub use crate::config::Settings;
pub use crate::core::{LogEntry, LogLevel, Outcome, RunError, State, StepError};
pub use crate::effects::{AsyncFlow, Flow};
pub use crate::report::RunReport;
