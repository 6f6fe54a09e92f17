//! Named scopes that tag failures with where they happened.

use super::async_flow::AsyncFlow;
use super::flow::Flow;
use crate::core::{Outcome, State};

/// Run `inner` inside the scope `name`.
///
/// If `inner` faults, every error it added that is not tagged yet gets the
/// full scope path appended, `"<message> (<outer> → … → <inner>)"`. Nested
/// scopes tag first, so outer scopes never double-tag. Log entries emitted
/// inside are one level deeper, and the first entry into a scope path logs
/// that path.
///
/// ```rust
/// use stepwise::config::Settings;
/// use stepwise::effects::{context, fail, Flow};
///
/// let flow: Flow<()> = context("Chrome", context("Start Page", fail("element not found")));
/// let outcome = flow.run(Settings::default());
/// assert_eq!(
///     outcome.state().errors()[0].message(),
///     "element not found (Chrome → Start Page)"
/// );
/// ```
pub fn context<A, Env>(name: impl Into<String>, inner: Flow<A, Env>) -> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    inner.in_context(name)
}

pub fn context_async<A, Env>(name: impl Into<String>, inner: AsyncFlow<A, Env>) -> AsyncFlow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    inner.in_context(name)
}

/// Bookkeeping between entering and leaving a scope.
pub(crate) struct Scope {
    depth: usize,
    errors_before: usize,
}

impl Scope {
    pub(crate) fn enter(state: &State, name: &str) -> (Self, State) {
        let scope = Self {
            depth: state.context().len(),
            errors_before: state.errors().len(),
        };
        (scope, state.clone().push_scope(name))
    }

    pub(crate) fn exit<A>(&self, outcome: Outcome<A>) -> Outcome<A> {
        let faulted = outcome.is_faulted();
        outcome.map_state(|state| {
            let state = if faulted { self.tag(state) } else { state };
            state.truncate_scopes(self.depth)
        })
    }

    fn tag(&self, state: State) -> State {
        let trail = state.context().to_vec();
        let errors = state
            .errors()
            .iter()
            .enumerate()
            .map(|(index, error)| {
                if index >= self.errors_before {
                    error.clone().tagged(&trail)
                } else {
                    error.clone()
                }
            })
            .collect();
        state.with_errors(errors)
    }
}
