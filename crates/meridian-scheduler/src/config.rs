//! Configuration for the scheduling core.

use std::time::Duration;

use figment::providers::{Env, Format, Toml};
use figment::Figment;
use serde::Deserialize;

use crate::error::{Result, SchedulerError};

/// Scheduling core configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Delay between retries of outstanding object fetches, in milliseconds.
    #[serde(with = "serde_duration_millis")]
    pub fetch_timeout: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            fetch_timeout: Duration::from_millis(1000),
        }
    }
}

impl SchedulerConfig {
    /// Loads configuration from `scheduler.toml` merged with
    /// `SCHEDULER_`-prefixed environment variables.
    pub fn load() -> Result<Self> {
        Self::from_figment(
            Figment::new()
                .merge(Toml::file("scheduler.toml"))
                .merge(Env::prefixed("SCHEDULER_")),
        )
    }

    fn from_figment(figment: Figment) -> Result<Self> {
        figment
            .extract()
            .map_err(|e| SchedulerError::Config(e.to_string()))
    }
}

/// Serde helper for Duration as milliseconds.
mod serde_duration_millis {
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
