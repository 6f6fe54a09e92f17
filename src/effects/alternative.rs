//! Fallback between two computations.

use super::async_flow::AsyncFlow;
use super::flow::Flow;
use crate::core::{Outcome, State, StepError};
use stillwater::Semigroup;

/// Try `lhs`; if it faults, try `rhs` against the same starting state.
///
/// The failed branch's effects never reach the fallback. When both fault,
/// the result carries the errors of both branches, left first.
///
/// ```rust
/// use stepwise::config::Settings;
/// use stepwise::effects::{alt, fail, Flow};
///
/// let both: Flow<()> = alt(fail("e1"), fail("e2"));
/// let outcome = both.run(Settings::default());
/// let messages: Vec<&str> = outcome.state().errors().iter().map(|e| e.message()).collect();
/// assert_eq!(messages, vec!["e1", "e2"]);
/// ```
pub fn alt<A, Env>(lhs: Flow<A, Env>, rhs: Flow<A, Env>) -> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    lhs.or(rhs)
}

pub fn alt_async<A, Env>(lhs: AsyncFlow<A, Env>, rhs: AsyncFlow<A, Env>) -> AsyncFlow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
{
    lhs.or(rhs)
}

/// Combine two faulted branches that both started from `origin`.
pub(crate) fn merge<A>(origin: &State, first: Outcome<A>, second: Outcome<A>) -> Outcome<A> {
    let errors = origin
        .errors()
        .to_vec()
        .combine(added_since(origin, &first))
        .combine(added_since(origin, &second));
    Outcome::faulted(second.into_state().with_errors(errors))
}

fn added_since<A>(origin: &State, outcome: &Outcome<A>) -> Vec<StepError> {
    outcome
        .state()
        .errors()
        .get(origin.errors().len()..)
        .map(<[StepError]>::to_vec)
        .unwrap_or_default()
}
