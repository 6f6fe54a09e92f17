//! Panic translation at invocation boundaries.
//!
//! Every variant routes user code through these two helpers, so a panic
//! inside a step, a continuation or a predicate becomes an error record on
//! the state the code was given.

use crate::core::{State, StepError};
use futures::FutureExt;
use std::future::Future;
use std::panic::{self, AssertUnwindSafe};

pub(crate) fn catch<T>(state: &State, f: impl FnOnce() -> T) -> Result<T, State> {
    panic::catch_unwind(AssertUnwindSafe(f))
        .map_err(|payload| state.clone().add_error(StepError::from_panic(payload)))
}

pub(crate) async fn catch_async<F>(state: &State, future: F) -> Result<F::Output, State>
where
    F: Future,
{
    AssertUnwindSafe(future)
        .catch_unwind()
        .await
        .map_err(|payload| state.clone().add_error(StepError::from_panic(payload)))
}
