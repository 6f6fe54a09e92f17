//! End-to-end runs against a fake browser driver.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use stepwise::config::{Settings, SettingsConfig};
use stepwise::core::{ErrorKind, LogEntry, Outcome, State};
use stepwise::effects::{
    asks, context, fail, from_async, from_fn, wait_for_async, wait_until, AsyncFlow, Flow,
    WaitPolicy,
};
use stepwise::logging::{info, warn};
use thiserror::Error;
use tracing_subscriber::EnvFilter;

type Driver = Arc<FakeBrowser>;

#[derive(Debug, Error)]
enum DriverError {
    #[error("navigation to {0} refused")]
    Refused(String),
}

/// Browser stand-in: an element becomes visible after a number of checks.
struct FakeBrowser {
    visible_after: usize,
    checks: AtomicUsize,
    url: Mutex<Option<String>>,
    clicks: Mutex<Vec<String>>,
    blocked: Vec<String>,
}

impl FakeBrowser {
    fn new(visible_after: usize) -> Driver {
        Self::blocking(visible_after, &[])
    }

    fn blocking(visible_after: usize, blocked: &[&str]) -> Driver {
        Arc::new(Self {
            visible_after,
            checks: AtomicUsize::new(0),
            url: Mutex::new(None),
            clicks: Mutex::new(Vec::new()),
            blocked: blocked.iter().map(|url| url.to_string()).collect(),
        })
    }
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

fn open(url: &str) -> Flow<(), Driver> {
    let url = url.to_string();
    from_fn(move |driver: &Driver, _state| {
        if driver.blocked.contains(&url) {
            return Err(DriverError::Refused(url.clone()));
        }
        *driver.url.lock().unwrap() = Some(url.clone());
        Ok(())
    })
}

fn tile_visible() -> Flow<bool, Driver> {
    asks(|driver: &Driver| {
        let checks = driver.checks.fetch_add(1, Ordering::SeqCst) + 1;
        checks >= driver.visible_after
    })
}

fn click(selector: &'static str) -> Flow<(), Driver> {
    info(format!("Clicking {selector}")).and_then(move |_| {
        asks(move |driver: &Driver| driver.clicks.lock().unwrap().push(selector.to_string()))
    })
}

fn open_patient_tile(policy: WaitPolicy) -> Flow<(), Driver> {
    info("Opening browser").and_then(move |_| {
        context(
            "Chrome",
            open("https://start").and_then(move |_| {
                context(
                    "Start Page",
                    wait_until(tile_visible(), |visible| *visible, policy)
                        .and_then(|_| click("#patient-tile")),
                )
            }),
        )
    })
}

fn lines(state: &State) -> Vec<String> {
    state.log().iter().map(LogEntry::render).collect()
}

fn messages(state: &State) -> Vec<String> {
    state.errors().iter().map(|e| e.message().to_string()).collect()
}

#[test]
fn patient_tile_opens_once_visible() {
    init_tracing();
    let driver = FakeBrowser::new(3);
    let settings = Settings::default();
    let collector = settings.log_stream().collector();
    let policy = WaitPolicy::new(Duration::from_millis(1), Duration::from_secs(5));

    let outcome = open_patient_tile(policy).run_with(&driver, settings);

    assert!(!outcome.is_faulted());
    assert_eq!(driver.checks.load(Ordering::SeqCst), 3);
    assert_eq!(*driver.clicks.lock().unwrap(), vec!["#patient-tile".to_string()]);
    assert_eq!(
        lines(outcome.state()),
        vec![
            "INFO: Opening browser",
            "Chrome",
            "  Chrome → Start Page",
            "    INFO: Clicking #patient-tile",
        ]
    );
    assert_eq!(collector.lines(), lines(outcome.state()));
}

#[test]
fn missing_tile_times_out_with_breadcrumb() {
    init_tracing();
    let driver = FakeBrowser::new(usize::MAX);
    let settings = Settings::default();
    let collector = settings.log_stream().collector();
    let policy = WaitPolicy::new(Duration::from_millis(5), Duration::from_millis(20));

    let outcome = open_patient_tile(policy).run_with(&driver, settings);

    assert!(outcome.is_faulted());
    assert_eq!(messages(outcome.state()), vec!["Timed out (Chrome → Start Page)"]);
    assert_eq!(outcome.state().errors()[0].kind(), ErrorKind::TimedOut);
    assert!(outcome.state().context().is_empty());
    assert!(driver.clicks.lock().unwrap().is_empty());
    assert_eq!(collector.lines(), lines(outcome.state()));
}

#[test]
fn try_run_surfaces_timeout() {
    let policy = WaitPolicy::new(Duration::from_millis(5), Duration::from_millis(10));
    let err = open_patient_tile(policy)
        .try_run_with(&FakeBrowser::new(usize::MAX), Settings::default())
        .unwrap_err();

    assert_eq!(err.to_string(), "Timed out (Chrome → Start Page)");
    assert_eq!(err.errors().len(), 1);
    assert!(err.state().log().len() >= 2);
}

#[test]
fn alternative_falls_back_to_mirror() {
    let driver = FakeBrowser::blocking(1, &["https://start"]);
    let flow = context("Chrome", open("https://start").or(open("https://mirror")));

    let outcome = flow.run_with(&driver, Settings::default());
    assert!(!outcome.is_faulted());
    assert_eq!(driver.url.lock().unwrap().as_deref(), Some("https://mirror"));

    let driver = FakeBrowser::blocking(1, &["https://start", "https://mirror"]);
    let outcome = flow.run_with(&driver, Settings::default());
    assert_eq!(
        messages(outcome.state()),
        vec![
            "navigation to https://start refused (Chrome)",
            "navigation to https://mirror refused (Chrome)",
        ]
    );
    assert!(outcome
        .state()
        .errors()
        .iter()
        .all(|e| e.kind() == ErrorKind::Raised));
}

#[test]
fn session_handle_threads_between_steps() {
    #[derive(Debug, PartialEq)]
    struct Tab {
        id: u32,
    }

    let flow: Flow<u32> = Flow::new(|_, state: &State| {
        Outcome::success(state.clone().with_session(Tab { id: 7 }), ())
    })
    .and_then(|_| from_fn(|_, state: &State| state.session::<Tab>().map(|tab| tab.id).ok_or("no tab")));

    let (state, id) = flow.try_run(Settings::default()).unwrap();
    assert_eq!(id, 7);
    assert_eq!(state.session::<Tab>(), Some(&Tab { id: 7 }));
}

#[test]
fn subscribers_see_entries_even_when_run_faults() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let first = Arc::clone(&order);
    let second = Arc::clone(&order);
    let settings = Settings::builder()
        .subscriber(move |e| first.lock().unwrap().push(format!("first: {}", e.message)))
        .subscriber(move |e| second.lock().unwrap().push(format!("second: {}", e.message)))
        .build();

    let flow: Flow<()> = info("one")
        .and_then(|_| warn("two"))
        .and_then(|_| fail("boom"));
    let outcome = flow.run(settings);

    assert!(outcome.is_faulted());
    assert_eq!(
        *order.lock().unwrap(),
        vec!["first: one", "second: one", "first: two", "second: two"]
    );
}

#[tokio::test]
async fn channel_subscriber_receives_in_order() {
    let settings = Settings::default();
    let mut entries = settings.log_stream().subscribe_channel();

    let flow: AsyncFlow<()> = info("a")
        .into_async()
        .and_then(|_| from_async(|_: (), _state| async { Ok::<_, std::io::Error>(()) }))
        .and_then_sync(|_| warn("b"));
    let outcome = flow.run(settings).await;
    assert!(!outcome.is_faulted());

    let first = entries.try_recv().unwrap();
    let second = entries.try_recv().unwrap();
    assert_eq!(first.render(), "INFO: a");
    assert_eq!(second.render(), "WARN: b");
}

#[tokio::test]
async fn async_driver_steps_read_environment() {
    let driver = FakeBrowser::new(1);
    let press: AsyncFlow<(), Driver> = from_async(|driver: Driver, _state| async move {
        driver.clicks.lock().unwrap().push("#login".to_string());
        Ok::<_, DriverError>(())
    });
    let flow = info::<Driver>("Logging in")
        .and_then_async(move |_| press.clone())
        .in_context("Login");

    let outcome = flow.run_with(&driver, Settings::default()).await;
    assert!(!outcome.is_faulted());
    assert_eq!(*driver.clicks.lock().unwrap(), vec!["#login".to_string()]);
    assert_eq!(lines(outcome.state()), vec!["Login", "  INFO: Logging in"]);
}

#[tokio::test(start_paused = true)]
async fn configured_poll_keeps_first_and_last_failures() {
    init_tracing();
    let settings = SettingsConfig::from_json(r#"{ "poll_interval": "300ms", "wait_budget": "1050ms" }"#)
        .unwrap()
        .into_settings()
        .unwrap();

    let attempts = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&attempts);
    let flaky: AsyncFlow<()> = AsyncFlow::new(move |_: (), state: State| {
        let attempt = seen.fetch_add(1, Ordering::SeqCst) + 1;
        async move { Outcome::failure(state, format!("Fail {attempt}")) }
    });

    let outcome = wait_for_async(flaky, |_| true).run(settings).await;

    assert_eq!(messages(outcome.state()), vec!["Fail 1", "Fail 4", "Timed out"]);
    assert_eq!(attempts.load(Ordering::SeqCst), 4);

    let report = outcome.state().report();
    assert_eq!(report.errors[2].kind, ErrorKind::TimedOut);
    assert!(report.to_json().unwrap().contains("Timed out"));
}
