//! Synchronous computations.
//!
//! A [`Flow`] wraps a step `Fn(&Env, &State) -> Outcome<A>`. The
//! environment-free variant is simply `Flow<A>` (`Env = ()`); the
//! environment-parameterized variant is `Flow<A, Env>`.

use super::alternative;
use super::async_flow::AsyncFlow;
use super::boundary::catch;
use super::context::Scope;
use super::wait::{self, WaitPolicy};
use crate::config::Settings;
use crate::core::{Outcome, RunError, State, StepError};
use std::error::Error;
use std::fmt;
use std::sync::Arc;
use stillwater::NonEmptyVec;

type SyncStep<A, Env> = dyn Fn(&Env, &State) -> Outcome<A> + Send + Sync;

/// An immutable, composable description of synchronous steps.
///
/// Nothing runs until [`Flow::run`] (or [`Flow::invoke`]) is called.
///
/// # Example
///
/// ```rust
/// use stepwise::config::Settings;
/// use stepwise::effects::{fail, pure, Flow};
///
/// let flow: Flow<i32> = pure(20).map(|n| n + 1).and_then(|n| pure(n * 2));
/// let outcome = flow.run(Settings::default());
/// assert_eq!(outcome.value(), Some(&42));
///
/// let broken: Flow<i32> = fail("no luck");
/// let outcome = broken.or(pure(7)).run(Settings::default());
/// assert_eq!(outcome.value(), Some(&7));
/// ```
pub struct Flow<A, Env = ()> {
    step: Arc<SyncStep<A, Env>>,
}

impl<A, Env> Clone for Flow<A, Env> {
    fn clone(&self) -> Self {
        Self {
            step: Arc::clone(&self.step),
        }
    }
}

impl<A, Env> fmt::Debug for Flow<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Flow(..)")
    }
}

impl<A, Env> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    /// Wrap a raw step function.
    pub fn new<F>(step: F) -> Self
    where
        F: Fn(&Env, &State) -> Outcome<A> + Send + Sync + 'static,
    {
        Self {
            step: Arc::new(step),
        }
    }

    /// Run the step against `state`. Panics become error records on `state`.
    pub fn invoke(&self, env: &Env, state: &State) -> Outcome<A> {
        catch(state, || (self.step)(env, state)).unwrap_or_else(Outcome::faulted)
    }

    /// Sequence a continuation chosen from the success value.
    ///
    /// The continuation runs against the state produced by `self`; on fault
    /// it is never called.
    pub fn and_then<B, F>(self, f: F) -> Flow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> Flow<B, Env> + Send + Sync + 'static,
    {
        Flow::new(move |env, state| match self.invoke(env, state).into_result() {
            Ok((state, value)) => match catch(&state, || f(value)) {
                Ok(next) => next.invoke(env, &state),
                Err(state) => Outcome::faulted(state),
            },
            Err(state) => Outcome::faulted(state),
        })
    }

    /// Sequence an asynchronous continuation.
    pub fn and_then_async<B, F>(self, f: F) -> AsyncFlow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> AsyncFlow<B, Env> + Send + Sync + 'static,
    {
        self.into_async().and_then(f)
    }

    pub fn map<B, F>(self, f: F) -> Flow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        Flow::new(move |env, state| match self.invoke(env, state).into_result() {
            Ok((state, value)) => match catch(&state, || f(value)) {
                Ok(mapped) => Outcome::success(state, mapped),
                Err(state) => Outcome::faulted(state),
            },
            Err(state) => Outcome::faulted(state),
        })
    }

    /// Rewrite the error sequence when the flow faults.
    pub fn map_errors<F>(self, f: F) -> Self
    where
        F: Fn(Vec<StepError>) -> Vec<StepError> + Send + Sync + 'static,
    {
        Flow::new(move |env, state| self.invoke(env, state).map_errors(&f))
    }

    pub fn bimap<B, F, G>(self, f: F, g: G) -> Flow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
        G: Fn(Vec<StepError>) -> Vec<StepError> + Send + Sync + 'static,
    {
        self.map_errors(g).map(f)
    }

    /// Fall back to `rhs` when `self` faults. See [`alt`](super::alt).
    pub fn or(self, rhs: Self) -> Self {
        Flow::new(move |env, state| {
            let first = self.invoke(env, state);
            if !first.is_faulted() {
                return first;
            }
            let second = rhs.invoke(env, state);
            if !second.is_faulted() {
                return second;
            }
            alternative::merge(state, first, second)
        })
    }

    /// Run inside a named scope. See [`context`](super::context).
    pub fn in_context(self, name: impl Into<String>) -> Self {
        let name = name.into();
        Flow::new(move |env, state| {
            let (scope, inner) = Scope::enter(state, &name);
            scope.exit(self.invoke(env, &inner))
        })
    }

    /// Poll until the value satisfies `predicate`. See [`wait_until`](super::wait_until).
    pub fn wait_until<P>(self, predicate: P, policy: WaitPolicy) -> Self
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        wait::wait_until(self, predicate, policy)
    }

    pub fn into_async(self) -> AsyncFlow<A, Env> {
        AsyncFlow::from(self)
    }

    /// Fix the environment, producing an environment-free flow.
    pub fn provide(self, env: Env) -> Flow<A> {
        Flow::new(move |_: &(), state| self.invoke(&env, state))
    }

    /// Run from a fresh state built from `settings`.
    pub fn run_with(&self, env: &Env, settings: Settings) -> Outcome<A> {
        let state = State::new(settings);
        let span = tracing::info_span!("run", run_id = %state.run_id());
        let _entered = span.enter();
        let outcome = self.invoke(env, &state);
        tracing::debug!(
            faulted = outcome.is_faulted(),
            errors = outcome.state().errors().len(),
            "run finished"
        );
        outcome
    }

    /// Like [`run_with`](Self::run_with), but a faulted run becomes `Err`.
    pub fn try_run_with(&self, env: &Env, settings: Settings) -> Result<(State, A), RunError> {
        checked(self.run_with(env, settings))
    }
}

impl<A> Flow<A>
where
    A: Send + 'static,
{
    /// Accept (and ignore) an environment.
    pub fn with_env<Env>(self) -> Flow<A, Env>
    where
        Env: Clone + Send + Sync + 'static,
    {
        Flow::new(move |_: &Env, state| self.invoke(&(), state))
    }

    pub fn run(&self, settings: Settings) -> Outcome<A> {
        self.run_with(&(), settings)
    }

    pub fn try_run(&self, settings: Settings) -> Result<(State, A), RunError> {
        self.try_run_with(&(), settings)
    }
}

/// Turn a terminal outcome into the `try_run` result.
pub(crate) fn checked<A>(outcome: Outcome<A>) -> Result<(State, A), RunError> {
    outcome.into_result().map_err(|state| {
        let errors = state.errors().to_vec();
        match NonEmptyVec::from_vec(errors) {
            Some(errors) => RunError::Faulted {
                errors,
                state: Box::new(state),
            },
            None => RunError::Faulted {
                errors: NonEmptyVec::new(StepError::new("run faulted without errors"), Vec::new()),
                state: Box::new(state),
            },
        }
    })
}

/// Always succeeds with `value`, leaving the state untouched.
pub fn pure<A, Env>(value: A) -> Flow<A, Env>
where
    A: Clone + Send + Sync + 'static,
    Env: Clone + Send + Sync + 'static,
{
    Flow::new(move |_, state| Outcome::success(state.clone(), value.clone()))
}

/// Always faults, appending `error` to whatever state it is given.
pub fn fail<A, Env>(error: impl Into<StepError>) -> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    let error = error.into();
    Flow::new(move |_, state| Outcome::failure(state.clone(), error.clone()))
}

/// Lift a fallible function; an `Err` becomes a raised error record.
pub fn from_fn<A, Env, E, F>(f: F) -> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    E: Into<Box<dyn Error + Send + Sync>>,
    F: Fn(&Env, &State) -> Result<A, E> + Send + Sync + 'static,
{
    Flow::new(move |env, state| match f(env, state) {
        Ok(value) => Outcome::success(state.clone(), value),
        Err(e) => Outcome::failure(state.clone(), StepError::raised(e)),
    })
}

/// Read the whole environment.
pub fn ask<Env>() -> Flow<Env, Env>
where
    Env: Clone + Send + Sync + 'static,
{
    Flow::new(|env: &Env, state| Outcome::success(state.clone(), env.clone()))
}

/// Read a projection of the environment.
pub fn asks<A, Env, F>(f: F) -> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    F: Fn(&Env) -> A + Send + Sync + 'static,
{
    Flow::new(move |env, state| Outcome::success(state.clone(), f(env)))
}
