//! Asynchronous computations.
//!
//! An [`AsyncFlow`] is either a lifted synchronous [`Flow`] or a step that
//! returns a future. Lifted flows stay synchronous under `map`, `and_then_sync`,
//! `or` and `in_context`; only an asynchronous piece makes the whole chain
//! suspend.

use super::alternative;
use super::boundary::{catch, catch_async};
use super::context::Scope;
use super::flow::{checked, Flow};
use super::wait::{self, WaitPolicy};
use crate::config::Settings;
use crate::core::{Outcome, RunError, State, StepError};
use futures::future::BoxFuture;
use futures::FutureExt;
use std::error::Error;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use tracing::Instrument;

type AsyncStep<A, Env> = dyn Fn(Env, State) -> BoxFuture<'static, Outcome<A>> + Send + Sync;

enum Inner<A, Env> {
    Ready(Flow<A, Env>),
    Suspended(Arc<AsyncStep<A, Env>>),
}

/// An immutable, composable description of steps that may suspend.
///
/// # Example
///
/// ```rust
/// use stepwise::config::Settings;
/// use stepwise::effects::{from_async, pure, AsyncFlow};
///
/// futures::executor::block_on(async {
///     let fetch: AsyncFlow<u32> =
///         from_async(|_env: (), _state| async { Ok::<_, std::io::Error>(41) });
///     let flow = fetch.and_then_sync(|n| pure(n + 1));
///     let outcome = flow.run(Settings::default()).await;
///     assert_eq!(outcome.value(), Some(&42));
/// });
/// ```
pub struct AsyncFlow<A, Env = ()> {
    inner: Inner<A, Env>,
}

impl<A, Env> Clone for AsyncFlow<A, Env> {
    fn clone(&self) -> Self {
        let inner = match &self.inner {
            Inner::Ready(flow) => Inner::Ready(flow.clone()),
            Inner::Suspended(step) => Inner::Suspended(Arc::clone(step)),
        };
        Self { inner }
    }
}

impl<A, Env> fmt::Debug for AsyncFlow<A, Env> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Inner::Ready(_) => f.write_str("AsyncFlow(ready)"),
            Inner::Suspended(_) => f.write_str("AsyncFlow(suspended)"),
        }
    }
}

impl<A, Env> From<Flow<A, Env>> for AsyncFlow<A, Env> {
    fn from(flow: Flow<A, Env>) -> Self {
        Self {
            inner: Inner::Ready(flow),
        }
    }
}

impl<A, Env> AsyncFlow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    /// Wrap a step that returns a future.
    pub fn new<F, Fut>(step: F) -> Self
    where
        F: Fn(Env, State) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Outcome<A>> + Send + 'static,
    {
        Self {
            inner: Inner::Suspended(Arc::new(move |env: Env, state: State| {
                step(env, state).boxed()
            })),
        }
    }

    /// True when running this flow can suspend.
    pub fn is_suspending(&self) -> bool {
        matches!(self.inner, Inner::Suspended(_))
    }

    fn ready(&self) -> Option<&Flow<A, Env>> {
        match &self.inner {
            Inner::Ready(flow) => Some(flow),
            Inner::Suspended(_) => None,
        }
    }

    /// Run the step against `state`. Panics while building or polling the
    /// future become error records on `state`.
    pub async fn invoke(&self, env: &Env, state: &State) -> Outcome<A> {
        match &self.inner {
            Inner::Ready(flow) => flow.invoke(env, state),
            Inner::Suspended(step) => {
                let pending = match catch(state, || step(env.clone(), state.clone())) {
                    Ok(pending) => pending,
                    Err(state) => return Outcome::faulted(state),
                };
                catch_async(state, pending)
                    .await
                    .unwrap_or_else(Outcome::faulted)
            }
        }
    }

    /// Sequence an asynchronous continuation.
    pub fn and_then<B, F>(self, f: F) -> AsyncFlow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> AsyncFlow<B, Env> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        AsyncFlow::new(move |env: Env, state: State| {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move {
                match this.invoke(&env, &state).await.into_result() {
                    Ok((state, value)) => match catch(&state, || f(value)) {
                        Ok(next) => next.invoke(&env, &state).await,
                        Err(state) => Outcome::faulted(state),
                    },
                    Err(state) => Outcome::faulted(state),
                }
            }
        })
    }

    /// Sequence a synchronous continuation.
    pub fn and_then_sync<B, F>(self, f: F) -> AsyncFlow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> Flow<B, Env> + Send + Sync + 'static,
    {
        if let Some(flow) = self.ready().cloned() {
            return flow.and_then(f).into_async();
        }
        self.and_then(move |value| f(value).into_async())
    }

    pub fn map<B, F>(self, f: F) -> AsyncFlow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
    {
        if let Some(flow) = self.ready().cloned() {
            return flow.map(f).into_async();
        }
        let f = Arc::new(f);
        AsyncFlow::new(move |env: Env, state: State| {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move {
                match this.invoke(&env, &state).await.into_result() {
                    Ok((state, value)) => match catch(&state, || f(value)) {
                        Ok(mapped) => Outcome::success(state, mapped),
                        Err(state) => Outcome::faulted(state),
                    },
                    Err(state) => Outcome::faulted(state),
                }
            }
        })
    }

    pub fn map_errors<F>(self, f: F) -> Self
    where
        F: Fn(Vec<StepError>) -> Vec<StepError> + Send + Sync + 'static,
    {
        if let Some(flow) = self.ready().cloned() {
            return flow.map_errors(f).into_async();
        }
        let f = Arc::new(f);
        AsyncFlow::new(move |env: Env, state: State| {
            let this = self.clone();
            let f = Arc::clone(&f);
            async move { this.invoke(&env, &state).await.map_errors(&*f) }
        })
    }

    pub fn bimap<B, F, G>(self, f: F, g: G) -> AsyncFlow<B, Env>
    where
        B: Send + 'static,
        F: Fn(A) -> B + Send + Sync + 'static,
        G: Fn(Vec<StepError>) -> Vec<StepError> + Send + Sync + 'static,
    {
        self.map_errors(g).map(f)
    }

    /// Fall back to `rhs` when `self` faults. See [`alt_async`](super::alt_async).
    pub fn or(self, rhs: Self) -> Self {
        if let (Some(lhs), Some(rhs)) = (self.ready().cloned(), rhs.ready().cloned()) {
            return lhs.or(rhs).into_async();
        }
        AsyncFlow::new(move |env: Env, state: State| {
            let lhs = self.clone();
            let rhs = rhs.clone();
            async move {
                let first = lhs.invoke(&env, &state).await;
                if !first.is_faulted() {
                    return first;
                }
                let second = rhs.invoke(&env, &state).await;
                if !second.is_faulted() {
                    return second;
                }
                alternative::merge(&state, first, second)
            }
        })
    }

    /// Run inside a named scope. See [`context_async`](super::context_async).
    pub fn in_context(self, name: impl Into<String>) -> Self {
        let name: String = name.into();
        if let Some(flow) = self.ready().cloned() {
            return flow.in_context(name).into_async();
        }
        let name: Arc<str> = Arc::from(name);
        AsyncFlow::new(move |env: Env, state: State| {
            let inner = self.clone();
            let name = Arc::clone(&name);
            async move {
                let (scope, entered) = Scope::enter(&state, &name);
                scope.exit(inner.invoke(&env, &entered).await)
            }
        })
    }

    /// Poll until the value satisfies `predicate`, sleeping on the tokio timer.
    pub fn wait_until<P>(self, predicate: P, policy: WaitPolicy) -> Self
    where
        P: Fn(&A) -> bool + Send + Sync + 'static,
    {
        wait::wait_until_async(self, predicate, policy)
    }

    /// Fix the environment, producing an environment-free flow.
    pub fn provide(self, env: Env) -> AsyncFlow<A> {
        if let Some(flow) = self.ready().cloned() {
            return flow.provide(env).into_async();
        }
        AsyncFlow::new(move |_: (), state: State| {
            let this = self.clone();
            let env = env.clone();
            async move { this.invoke(&env, &state).await }
        })
    }

    /// Run from a fresh state built from `settings`.
    pub async fn run_with(&self, env: &Env, settings: Settings) -> Outcome<A> {
        let state = State::new(settings);
        let span = tracing::info_span!("run", run_id = %state.run_id());
        async {
            let outcome = self.invoke(env, &state).await;
            tracing::debug!(
                faulted = outcome.is_faulted(),
                errors = outcome.state().errors().len(),
                "run finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    /// Like [`run_with`](Self::run_with), but a faulted run becomes `Err`.
    pub async fn try_run_with(&self, env: &Env, settings: Settings) -> Result<(State, A), RunError> {
        checked(self.run_with(env, settings).await)
    }
}

impl<A> AsyncFlow<A>
where
    A: Send + 'static,
{
    /// Accept (and ignore) an environment.
    pub fn with_env<Env>(self) -> AsyncFlow<A, Env>
    where
        Env: Clone + Send + Sync + 'static,
    {
        if let Some(flow) = self.ready().cloned() {
            return flow.with_env().into_async();
        }
        AsyncFlow::new(move |_: Env, state: State| {
            let this = self.clone();
            async move { this.invoke(&(), &state).await }
        })
    }

    pub async fn run(&self, settings: Settings) -> Outcome<A> {
        self.run_with(&(), settings).await
    }

    pub async fn try_run(&self, settings: Settings) -> Result<(State, A), RunError> {
        self.try_run_with(&(), settings).await
    }
}

/// Lift an async function; an `Err` becomes a raised error record.
pub fn from_async<A, Env, E, F, Fut>(f: F) -> AsyncFlow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    E: Into<Box<dyn Error + Send + Sync>>,
    F: Fn(Env, State) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<A, E>> + Send + 'static,
{
    AsyncFlow::new(move |env: Env, state: State| {
        let pending = f(env, state.clone());
        async move {
            match pending.await {
                Ok(value) => Outcome::success(state, value),
                Err(e) => Outcome::failure(state, StepError::raised(e)),
            }
        }
    })
}
