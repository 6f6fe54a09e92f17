//! Fan-out of log entries to subscribers.

use crate::core::{LogEntry, LogLevel};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};
use tokio::sync::mpsc;

type Subscriber = Arc<dyn Fn(&LogEntry) + Send + Sync>;

/// Subscribable stream of log entries, owned by [`Settings`](crate::config::Settings).
///
/// Subscribers receive every published entry in emission order; delivery to
/// several subscribers follows subscription order. Every entry is also
/// mirrored as a `tracing` event.
#[derive(Clone, Default)]
pub struct LogStream {
    subscribers: Arc<RwLock<Vec<Subscriber>>>,
}

impl LogStream {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, callback: F)
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        self.subscribers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(Arc::new(callback));
    }

    /// Subscribe through an unbounded channel.
    ///
    /// Entries published after the receiver is dropped are discarded.
    pub fn subscribe_channel(&self) -> mpsc::UnboundedReceiver<LogEntry> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribe(move |entry| {
            let _ = tx.send(entry.clone());
        });
        rx
    }

    /// Subscribe a collector that keeps every entry in memory.
    pub fn collector(&self) -> LogCollector {
        let collector = LogCollector::default();
        let sink = collector.clone();
        self.subscribe(move |entry| sink.push(entry.clone()));
        collector
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn publish(&self, entry: &LogEntry) {
        match entry.level {
            LogLevel::Scope => tracing::debug!(depth = entry.depth, scope = %entry.message, "entered scope"),
            LogLevel::Info => tracing::info!(depth = entry.depth, "{}", entry.message),
            LogLevel::Warn => tracing::warn!(depth = entry.depth, "{}", entry.message),
        }

        // subscribers run outside the lock
        let subscribers: Vec<Subscriber> = self
            .subscribers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for subscriber in subscribers {
            subscriber(entry);
        }
    }
}

impl fmt::Debug for LogStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogStream")
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

/// In-memory subscriber, mostly useful in tests.
#[derive(Clone, Debug, Default)]
pub struct LogCollector {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl LogCollector {
    fn push(&self, entry: LogEntry) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(entry);
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Entries rendered with [`LogEntry::render`].
    pub fn lines(&self) -> Vec<String> {
        self.entries().iter().map(LogEntry::render).collect()
    }
}
