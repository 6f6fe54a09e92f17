//! Fluent builder for [`Settings`].

use super::{Settings, SettingsInner};
use crate::core::LogEntry;
use crate::effects::{Retention, WaitPolicy};
use crate::logging::LogStream;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;

/// Builder for [`Settings`].
pub struct SettingsBuilder {
    log: LogStream,
    wait: WaitPolicy,
    params: Map<String, Value>,
}

impl SettingsBuilder {
    pub fn new() -> Self {
        Self {
            log: LogStream::new(),
            wait: WaitPolicy::default(),
            params: Map::new(),
        }
    }

    /// Share an existing log stream instead of creating a fresh one.
    pub fn log_stream(mut self, stream: LogStream) -> Self {
        self.log = stream;
        self
    }

    /// Attach a log subscriber before the settings are handed to a run.
    pub fn subscriber<F>(self, callback: F) -> Self
    where
        F: Fn(&LogEntry) + Send + Sync + 'static,
    {
        self.log.subscribe(callback);
        self
    }

    pub fn wait_policy(mut self, policy: WaitPolicy) -> Self {
        self.wait = policy;
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.wait = self.wait.with_interval(interval);
        self
    }

    pub fn wait_budget(mut self, budget: Duration) -> Self {
        self.wait = self.wait.with_budget(budget);
        self
    }

    pub fn retention(mut self, retention: Retention) -> Self {
        self.wait = self.wait.with_retention(retention);
        self
    }

    /// Store an opaque parameter for the driver steps.
    pub fn param(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.params.insert(key.into(), value.into());
        self
    }

    pub fn params(mut self, params: Map<String, Value>) -> Self {
        self.params.extend(params);
        self
    }

    pub fn build(self) -> Settings {
        Settings {
            inner: Arc::new(SettingsInner {
                log: self.log,
                wait: self.wait,
                params: self.params,
            }),
        }
    }
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self::new()
    }
}
