//! The result of invoking a computation: a state plus an optional value.

use super::error::{StepError, NO_VALUE};
use super::state::State;

/// Terminal (or intermediate) result of a computation.
///
/// An outcome is faulted exactly when its state carries errors; the value of
/// a faulted outcome is never exposed. An outcome without a value always
/// carries at least one error.
#[derive(Clone, Debug)]
pub struct Outcome<A> {
    state: State,
    value: Option<A>,
}

impl<A> Outcome<A> {
    pub fn success(state: State, value: A) -> Self {
        Self {
            state,
            value: Some(value),
        }
    }

    /// Append `error` to `state` and produce a faulted outcome.
    pub fn failure(state: State, error: impl Into<StepError>) -> Self {
        Self {
            state: state.add_error(error),
            value: None,
        }
    }

    /// Carry a faulted state forward. A state without errors gets
    /// [`NO_VALUE`] recorded.
    pub(crate) fn faulted(state: State) -> Self {
        let state = if state.is_faulted() {
            state
        } else {
            state.add_error(NO_VALUE)
        };
        Self { state, value: None }
    }

    pub fn is_faulted(&self) -> bool {
        self.state.is_faulted()
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    /// The success value, or `None` when faulted.
    pub fn value(&self) -> Option<&A> {
        if self.state.is_faulted() {
            None
        } else {
            self.value.as_ref()
        }
    }

    pub fn into_state(self) -> State {
        self.state
    }

    /// Split into the state and the value (absent when faulted).
    pub fn into_parts(self) -> (State, Option<A>) {
        if self.state.is_faulted() {
            (self.state, None)
        } else {
            (self.state, self.value)
        }
    }

    /// `Ok((state, value))` on success, `Err(state)` when faulted.
    pub fn into_result(self) -> Result<(State, A), State> {
        match (self.state.is_faulted(), self.value) {
            (false, Some(value)) => Ok((self.state, value)),
            (true, _) => Err(self.state),
            (false, None) => Err(self.state.add_error(NO_VALUE)),
        }
    }

    /// Reinterpret a faulted outcome at another value type.
    ///
    /// Casting a successful outcome drops its value and records
    /// [`NO_VALUE`].
    pub fn cast_error<B>(self) -> Outcome<B> {
        Outcome::faulted(self.state)
    }

    /// Rewrite the error sequence of a faulted outcome.
    ///
    /// The outcome stays faulted: if `f` returns no errors, [`NO_VALUE`] is
    /// recorded in their place.
    pub fn map_errors<F>(self, f: F) -> Self
    where
        F: FnOnce(Vec<StepError>) -> Vec<StepError>,
    {
        if !self.state.is_faulted() {
            return self;
        }
        let errors = f(self.state.errors().to_vec());
        Self::faulted(self.state.with_errors(errors))
    }

    pub(crate) fn map_state<F>(self, f: F) -> Self
    where
        F: FnOnce(State) -> State,
    {
        Self {
            state: f(self.state),
            value: self.value,
        }
    }
}
