//! Serializable settings, validated with `Validation` so every problem is
//! reported at once.

use super::builder::SettingsBuilder;
use super::error::ConfigError;
use super::Settings;
use crate::effects::{Retention, WaitPolicy};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

/// On-disk / over-the-wire form of [`Settings`].
///
/// Durations use humantime notation (`"300ms"`, `"10s"`).
///
/// ```rust
/// use stepwise::config::SettingsConfig;
/// use std::time::Duration;
///
/// let config = SettingsConfig::from_json(
///     r#"{ "poll_interval": "300ms", "wait_budget": "2s", "params": { "browser": "chrome" } }"#,
/// ).unwrap();
///
/// let settings = config.into_settings().unwrap();
/// assert_eq!(settings.wait_policy().budget(), Duration::from_secs(2));
/// ```
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsConfig {
    #[serde(with = "humantime_serde")]
    pub poll_interval: Duration,

    #[serde(with = "humantime_serde")]
    pub wait_budget: Duration,

    pub retention: Retention,

    pub params: Map<String, Value>,
}

impl Default for SettingsConfig {
    fn default() -> Self {
        let policy = WaitPolicy::default();
        Self {
            poll_interval: policy.interval(),
            wait_budget: policy.budget(),
            retention: policy.retention(),
            params: Map::new(),
        }
    }
}

impl SettingsConfig {
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Check every rule, accumulating all violations.
    pub fn validate(&self) -> Validation<(), NonEmptyVec<ConfigError>> {
        let interval = if self.poll_interval.is_zero() {
            Validation::fail(ConfigError::ZeroInterval)
        } else {
            Validation::success(())
        };

        let budget = if self.wait_budget.is_zero() {
            Validation::fail(ConfigError::ZeroBudget)
        } else {
            Validation::success(())
        };

        let ordering = if self.wait_budget < self.poll_interval {
            Validation::fail(ConfigError::BudgetShorterThanInterval {
                budget: self.wait_budget,
                interval: self.poll_interval,
            })
        } else {
            Validation::success(())
        };

        Validation::all_vec(vec![interval, budget, ordering]).map(|_| ())
    }

    pub fn wait_policy(&self) -> WaitPolicy {
        WaitPolicy::new(self.poll_interval, self.wait_budget).with_retention(self.retention)
    }

    /// Validate and turn into a builder, so subscribers can still be added.
    pub fn into_builder(self) -> Result<SettingsBuilder, NonEmptyVec<ConfigError>> {
        match self.validate() {
            Validation::Success(()) => Ok(SettingsBuilder::new()
                .wait_policy(self.wait_policy())
                .params(self.params)),
            Validation::Failure(errors) => Err(errors),
        }
    }

    pub fn into_settings(self) -> Result<Settings, NonEmptyVec<ConfigError>> {
        self.into_builder().map(SettingsBuilder::build)
    }
}
