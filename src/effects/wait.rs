//! Poll a computation until its value satisfies a predicate.
//!
//! Every attempt starts from the state the poll was given, never from a
//! failed attempt's state. The deadline is only checked between attempts:
//! a running attempt is never interrupted.

use super::async_flow::AsyncFlow;
use super::boundary::catch;
use super::flow::Flow;
use crate::core::{Outcome, State, StepError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use stillwater::Semigroup;

/// Which failed attempts keep their errors once the poll times out.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Retention {
    /// Errors of the first and of the most recent attempt.
    #[default]
    FirstAndLast,

    /// Only the most recent attempt's errors.
    LastOnly,

    /// Every attempt's errors, in order.
    All,
}

/// Poll interval, total wait budget and retention rule.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WaitPolicy {
    interval: Duration,
    budget: Duration,
    retention: Retention,
}

impl Default for WaitPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(10))
    }
}

impl WaitPolicy {
    pub fn new(interval: Duration, budget: Duration) -> Self {
        Self {
            interval,
            budget,
            retention: Retention::default(),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_budget(mut self, budget: Duration) -> Self {
        self.budget = budget;
        self
    }

    pub fn with_retention(mut self, retention: Retention) -> Self {
        self.retention = retention;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn budget(&self) -> Duration {
        self.budget
    }

    pub fn retention(&self) -> Retention {
        self.retention
    }

    /// True when another attempt would start past the budget.
    pub fn exhausted(&self, elapsed: Duration) -> bool {
        elapsed.saturating_add(self.interval) > self.budget
    }
}

/// Errors collected across the attempts of one poll.
pub(crate) struct Attempts {
    retention: Retention,
    base: usize,
    count: usize,
    first: Vec<StepError>,
    last: Vec<StepError>,
    all: Vec<StepError>,
}

impl Attempts {
    pub(crate) fn new(retention: Retention, origin: &State) -> Self {
        Self {
            retention,
            base: origin.errors().len(),
            count: 0,
            first: Vec::new(),
            last: Vec::new(),
            all: Vec::new(),
        }
    }

    pub(crate) fn failed(&mut self, terminal: &State) {
        let added = terminal
            .errors()
            .get(self.base..)
            .map(<[StepError]>::to_vec)
            .unwrap_or_default();
        self.record(added);
    }

    pub(crate) fn unsatisfied(&mut self) {
        self.record(Vec::new());
    }

    fn record(&mut self, errors: Vec<StepError>) {
        self.count += 1;
        tracing::debug!(attempt = self.count, errors = errors.len(), "poll attempt did not settle");
        match self.retention {
            Retention::All => self.all.extend(errors),
            Retention::FirstAndLast if self.count == 1 => self.first = errors,
            Retention::FirstAndLast | Retention::LastOnly => self.last = errors,
        }
    }

    pub(crate) fn timed_out<A>(self, origin: &State) -> Outcome<A> {
        tracing::warn!(attempts = self.count, "poll timed out");
        let retained = match self.retention {
            Retention::All => self.all,
            Retention::FirstAndLast => self.first.combine(self.last),
            Retention::LastOnly => self.last,
        };
        let errors = origin
            .errors()
            .to_vec()
            .combine(retained)
            .combine(vec![StepError::timed_out()]);
        Outcome::faulted(origin.clone().with_errors(errors))
    }
}

/// Re-run `flow` until it succeeds with a value satisfying `predicate`.
///
/// Sleeps with `std::thread::sleep` between attempts; use
/// [`wait_until_async`] inside async code.
pub fn wait_until<A, Env, P>(flow: Flow<A, Env>, predicate: P, policy: WaitPolicy) -> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    Flow::new(move |env, state| poll_blocking(&flow, &predicate, policy, env, state))
}

/// Like [`wait_until`], with the policy taken from the run's settings.
pub fn wait_for<A, Env, P>(flow: Flow<A, Env>, predicate: P) -> Flow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    Flow::new(move |env, state| {
        let policy = state.settings().wait_policy();
        poll_blocking(&flow, &predicate, policy, env, state)
    })
}

fn poll_blocking<A, Env, P>(
    flow: &Flow<A, Env>,
    predicate: &P,
    policy: WaitPolicy,
    env: &Env,
    state: &State,
) -> Outcome<A>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    P: Fn(&A) -> bool,
{
    let started = Instant::now();
    let mut attempts = Attempts::new(policy.retention(), state);
    loop {
        match flow.invoke(env, state).into_result() {
            Ok((settled, value)) => match catch(&settled, || predicate(&value)) {
                Ok(true) => return Outcome::success(settled, value),
                Ok(false) => attempts.unsatisfied(),
                Err(failed) => attempts.failed(&failed),
            },
            Err(failed) => attempts.failed(&failed),
        }
        if policy.exhausted(started.elapsed()) {
            return attempts.timed_out(state);
        }
        std::thread::sleep(policy.interval());
    }
}

/// Asynchronous [`wait_until`]; sleeps on the tokio timer between attempts.
pub fn wait_until_async<A, Env, P>(
    flow: AsyncFlow<A, Env>,
    predicate: P,
    policy: WaitPolicy,
) -> AsyncFlow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    AsyncFlow::new(move |env: Env, state: State| {
        let flow = flow.clone();
        let predicate = Arc::clone(&predicate);
        async move { poll(&flow, &*predicate, policy, &env, &state).await }
    })
}

/// Like [`wait_until_async`], with the policy taken from the run's settings.
pub fn wait_for_async<A, Env, P>(flow: AsyncFlow<A, Env>, predicate: P) -> AsyncFlow<A, Env>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    P: Fn(&A) -> bool + Send + Sync + 'static,
{
    let predicate = Arc::new(predicate);
    AsyncFlow::new(move |env: Env, state: State| {
        let flow = flow.clone();
        let predicate = Arc::clone(&predicate);
        async move {
            let policy = state.settings().wait_policy();
            poll(&flow, &*predicate, policy, &env, &state).await
        }
    })
}

async fn poll<A, Env, P>(
    flow: &AsyncFlow<A, Env>,
    predicate: &P,
    policy: WaitPolicy,
    env: &Env,
    state: &State,
) -> Outcome<A>
where
    A: Send + 'static,
    Env: Clone + Send + Sync + 'static,
    P: Fn(&A) -> bool + Sync,
{
    let started = tokio::time::Instant::now();
    let mut attempts = Attempts::new(policy.retention(), state);
    loop {
        match flow.invoke(env, state).await.into_result() {
            Ok((settled, value)) => match catch(&settled, || predicate(&value)) {
                Ok(true) => return Outcome::success(settled, value),
                Ok(false) => attempts.unsatisfied(),
                Err(failed) => attempts.failed(&failed),
            },
            Err(failed) => attempts.failed(&failed),
        }
        if policy.exhausted(started.elapsed()) {
            return attempts.timed_out(state);
        }
        tokio::time::sleep(policy.interval()).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::core::{ErrorKind, LogEntry};
    use crate::effects::context;
    use crate::logging::info;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn messages(state: &State) -> Vec<&str> {
        state.errors().iter().map(|e| e.message()).collect()
    }

    /// Fails with "Fail n" on the n-th attempt.
    fn always_failing(counter: Arc<AtomicUsize>) -> Flow<u32> {
        Flow::new(move |_, state| {
            let attempt = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Outcome::failure(state.clone(), format!("Fail {attempt}"))
        })
    }

    /// Counts up on every attempt.
    fn counting(counter: Arc<AtomicUsize>) -> Flow<usize> {
        Flow::new(move |_, state| {
            Outcome::success(state.clone(), counter.fetch_add(1, Ordering::SeqCst) + 1)
        })
    }

    #[test]
    fn exhausted_checks_next_attempt() {
        let policy = WaitPolicy::new(Duration::from_millis(300), Duration::from_millis(1050));
        assert!(!policy.exhausted(Duration::from_millis(600)));
        assert!(policy.exhausted(Duration::from_millis(900)));
    }

    #[test]
    fn returns_first_satisfying_value() {
        let counter = Arc::new(AtomicUsize::new(0));
        let flow = wait_until(
            counting(Arc::clone(&counter)),
            |n| *n >= 3,
            WaitPolicy::new(Duration::from_millis(1), Duration::from_secs(5)),
        );
        let outcome = flow.run(Settings::default());
        assert_eq!(outcome.value(), Some(&3));
        assert!(outcome.state().errors().is_empty());
    }

    #[test]
    fn immediate_success_does_not_sleep() {
        let flow: Flow<u8> = crate::effects::pure(1);
        let started = Instant::now();
        let outcome = flow
            .wait_until(|_| true, WaitPolicy::new(Duration::from_secs(5), Duration::from_secs(10)))
            .run(Settings::default());
        assert_eq!(outcome.value(), Some(&1));
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn blocking_poll_keeps_first_and_last() {
        let counter = Arc::new(AtomicUsize::new(0));
        let flow = wait_until(
            always_failing(Arc::clone(&counter)),
            |_| true,
            WaitPolicy::new(Duration::from_millis(300), Duration::from_millis(1050)),
        );
        let outcome = flow.run(Settings::default());
        assert_eq!(messages(outcome.state()), vec!["Fail 1", "Fail 4", "Timed out"]);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
        assert_eq!(
            outcome.state().errors().last().map(StepError::kind),
            Some(ErrorKind::TimedOut)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn async_poll_keeps_first_and_last() {
        let counter = Arc::new(AtomicUsize::new(0));
        let flow = wait_until_async(
            always_failing(Arc::clone(&counter)).into_async(),
            |_| true,
            WaitPolicy::new(Duration::from_millis(300), Duration::from_millis(1050)),
        );
        let outcome = flow.run(Settings::default()).await;
        assert_eq!(messages(outcome.state()), vec!["Fail 1", "Fail 4", "Timed out"]);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn retention_policies() {
        let policy = WaitPolicy::new(Duration::from_millis(300), Duration::from_millis(1050));

        let counter = Arc::new(AtomicUsize::new(0));
        let flow = wait_until_async(
            always_failing(Arc::clone(&counter)).into_async(),
            |_| true,
            policy.with_retention(Retention::LastOnly),
        );
        let outcome = flow.run(Settings::default()).await;
        assert_eq!(messages(outcome.state()), vec!["Fail 4", "Timed out"]);

        let counter = Arc::new(AtomicUsize::new(0));
        let flow = wait_until_async(
            always_failing(Arc::clone(&counter)).into_async(),
            |_| true,
            policy.with_retention(Retention::All),
        );
        let outcome = flow.run(Settings::default()).await;
        assert_eq!(
            messages(outcome.state()),
            vec!["Fail 1", "Fail 2", "Fail 3", "Fail 4", "Timed out"]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn unsatisfied_predicate_times_out_without_attempt_errors() {
        let counter = Arc::new(AtomicUsize::new(0));
        let flow = wait_until_async(
            counting(Arc::clone(&counter)).into_async(),
            |n| *n > 100,
            WaitPolicy::new(Duration::from_millis(100), Duration::from_millis(350)),
        );
        let outcome = flow.run(Settings::default()).await;
        assert_eq!(messages(outcome.state()), vec!["Timed out"]);
        assert_eq!(counter.load(Ordering::SeqCst), 4);
    }

    #[tokio::test(start_paused = true)]
    async fn each_attempt_starts_from_original_state() {
        let attempt_logs = Arc::new(std::sync::Mutex::new(Vec::new()));
        let seen = Arc::clone(&attempt_logs);
        let step: Flow<()> = crate::logging::info("attempt").and_then(move |_| {
            let seen = Arc::clone(&seen);
            Flow::new(move |_, state: &State| {
                seen.lock().unwrap().push(state.log().len());
                Outcome::failure(state.clone(), "not yet")
            })
        });
        let flow = wait_until_async(
            step.into_async(),
            |_| true,
            WaitPolicy::new(Duration::from_millis(10), Duration::from_millis(25)),
        );
        let outcome = flow.run(Settings::default()).await;
        assert_eq!(*attempt_logs.lock().unwrap(), vec![1, 1, 1]);
        assert!(outcome.state().log().is_empty());
    }

    #[test]
    fn panicking_predicate_counts_as_failed_attempt() {
        let flow: Flow<u8> = crate::effects::pure(1);
        let outcome = flow
            .wait_until(
                |_| panic!("predicate blew up"),
                WaitPolicy::new(Duration::from_millis(50), Duration::from_millis(10)),
            )
            .run(Settings::default());
        assert_eq!(messages(outcome.state()), vec!["predicate blew up", "Timed out"]);
    }

    #[tokio::test(start_paused = true)]
    async fn wait_for_uses_settings_policy() {
        let counter = Arc::new(AtomicUsize::new(0));
        let settings = Settings::builder()
            .poll_interval(Duration::from_millis(300))
            .wait_budget(Duration::from_millis(1050))
            .build();
        let flow = wait_for_async(always_failing(Arc::clone(&counter)).into_async(), |_| true);
        let outcome = flow.run(settings).await;
        assert_eq!(messages(outcome.state()), vec!["Fail 1", "Fail 4", "Timed out"]);
    }

    #[test]
    fn blocking_wait_for_uses_settings_policy() {
        let counter = Arc::new(AtomicUsize::new(0));
        let settings = Settings::builder()
            .poll_interval(Duration::from_millis(50))
            .wait_budget(Duration::from_millis(10))
            .build();
        let flow = wait_for(always_failing(Arc::clone(&counter)), |_| true);
        let outcome = flow.run(settings);
        assert_eq!(messages(outcome.state()), vec!["Fail 1", "Timed out"]);
    }

    #[test]
    fn retried_attempt_announces_scope_again() {
        let counter = Arc::new(AtomicUsize::new(0));
        let fails_once: Flow<u32> = Flow::new(move |_, state| {
            match counter.fetch_add(1, Ordering::SeqCst) {
                0 => Outcome::failure(state.clone(), "not yet"),
                attempt => Outcome::success(state.clone(), attempt as u32),
            }
        });
        let checked = context("Tile", info("checking").and_then(move |_| fails_once.clone()));
        let outcome = wait_until(
            checked,
            |_| true,
            WaitPolicy::new(Duration::from_millis(1), Duration::from_secs(1)),
        )
        .run(Settings::default());

        assert_eq!(outcome.value(), Some(&1));
        let lines: Vec<String> = outcome.state().log().iter().map(LogEntry::render).collect();
        assert_eq!(lines, vec!["Tile", "  INFO: checking"]);
    }
}
