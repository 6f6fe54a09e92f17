//! Composable computations over [`State`](crate::core::State).
//!
//! This module is the engine: steps are described as values, composed, and
//! only run when handed a fresh state.
//!
//! # Key Concepts
//!
//! - **Flow**: a synchronous step `Fn(&Env, &State) -> Outcome<A>`
//! - **AsyncFlow**: a step that may suspend; lifted flows stay synchronous
//! - **Environment**: `Env = ()` for environment-free flows, otherwise an
//!   injected value read with [`ask`] / [`asks`]
//! - **Combinators**: [`alt`] falls back, [`context`] tags failures with a
//!   breadcrumb, [`wait_until`] polls until a predicate holds
//!
//! Follows Stillwater conventions: free-standing constructors `pure()`,
//! `fail()`, `from_fn()`, methods for composition.
//!
//! # Example
//!
//! ```rust
//! use stepwise::config::Settings;
//! use stepwise::effects::{context, fail, pure, Flow};
//!
//! let open_tile: Flow<()> = context("Start Page", fail("element not found"));
//! let flow = open_tile.or(pure(()));
//! assert!(flow.run(Settings::default()).value().is_some());
//! ```

mod alternative;
mod async_flow;
mod boundary;
mod context;
mod flow;
mod wait;

pub use alternative::{alt, alt_async};
pub use async_flow::{from_async, AsyncFlow};
pub use context::{context, context_async};
pub use flow::{ask, asks, fail, from_fn, pure, Flow};
pub use wait::{wait_for, wait_for_async, wait_until, wait_until_async, Retention, WaitPolicy};
