//! Settings carried through a run.
//!
//! The engine treats [`Settings`] as read-only: it only reads the log stream
//! and the default wait policy. Everything else is an opaque parameter bag for
//! the steps that drive the external session.
//!
//! # Example
//!
//! ```rust
//! use stepwise::config::Settings;
//! use std::time::Duration;
//!
//! let settings = Settings::builder()
//!     .poll_interval(Duration::from_millis(250))
//!     .wait_budget(Duration::from_secs(5))
//!     .param("browser", "chrome")
//!     .build();
//!
//! assert_eq!(settings.wait_policy().interval(), Duration::from_millis(250));
//! assert_eq!(settings.param::<String>("browser").unwrap().as_deref(), Some("chrome"));
//! ```

mod builder;
mod error;
mod file;

pub use builder::SettingsBuilder;
pub use error::ConfigError;
pub use file::SettingsConfig;

use crate::effects::WaitPolicy;
use crate::logging::LogStream;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;

/// Read-only configuration shared by every state of a run.
#[derive(Clone, Default)]
pub struct Settings {
    inner: Arc<SettingsInner>,
}

#[derive(Default)]
struct SettingsInner {
    log: LogStream,
    wait: WaitPolicy,
    params: Map<String, Value>,
}

impl Settings {
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::new()
    }

    /// Stream every log entry of a run is published to.
    pub fn log_stream(&self) -> &LogStream {
        &self.inner.log
    }

    /// Policy used by `wait_for` when no explicit policy is given.
    pub fn wait_policy(&self) -> WaitPolicy {
        self.inner.wait
    }

    pub fn params(&self) -> &Map<String, Value> {
        &self.inner.params
    }

    /// Deserialize the parameter stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    pub fn param<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        self.inner
            .params
            .get(key)
            .map(|value| {
                serde_json::from_value(value.clone()).map_err(|e| ConfigError::InvalidParam {
                    key: key.to_string(),
                    message: e.to_string(),
                })
            })
            .transpose()
    }
}

impl fmt::Debug for Settings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("log", &self.inner.log)
            .field("wait", &self.inner.wait)
            .field("params", &self.inner.params)
            .finish()
    }
}
