//! Job engine configuration.

use crate::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for the job engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobsConfig {
    /// Maximum jobs processed per dispatch tick.
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    /// Attempt budget for jobs that do not set their own.
    #[serde(default = "default_max_attempts")]
    pub default_max_attempts: u32,

    /// Base retry backoff in seconds. Doubled per attempt.
    #[serde(default = "default_backoff_base")]
    pub backoff_base_secs: u64,

    /// Optional ceiling on the retry backoff, in seconds. `None` leaves
    /// the exponential curve uncapped.
    #[serde(default)]
    pub backoff_max_delay_secs: Option<u64>,

    /// Days to keep terminal jobs before cleanup removes them.
    #[serde(default = "default_retention_days")]
    pub retention_days: u32,
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            batch_size: default_batch_size(),
            default_max_attempts: default_max_attempts(),
            backoff_base_secs: default_backoff_base(),
            backoff_max_delay_secs: None,
            retention_days: default_retention_days(),
        }
    }
}

impl JobsConfig {
    /// Builds the retry policy these settings describe.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            base: Duration::from_secs(self.backoff_base_secs),
            max_delay: self.backoff_max_delay_secs.map(Duration::from_secs),
        }
    }
}

fn default_batch_size() -> usize {
    10
}

fn default_max_attempts() -> u32 {
    3
}

fn default_backoff_base() -> u64 {
    60
}

fn default_retention_days() -> u32 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = JobsConfig::default();
        assert_eq!(config.batch_size, 10);
        assert_eq!(config.default_max_attempts, 3);
        assert_eq!(config.backoff_base_secs, 60);
        assert_eq!(config.backoff_max_delay_secs, None);
        assert_eq!(config.retention_days, 30);
    }

    #[test]
    fn test_deserialize_partial() {
        let config: JobsConfig =
            serde_json::from_str(r#"{"batch_size": 50, "backoff_max_delay_secs": 3600}"#).unwrap();
        assert_eq!(config.batch_size, 50);
        assert_eq!(config.default_max_attempts, 3);
        assert_eq!(config.backoff_max_delay_secs, Some(3600));
    }

    #[test]
    fn test_retry_policy_from_config() {
        let config = JobsConfig {
            backoff_base_secs: 30,
            backoff_max_delay_secs: Some(600),
            ..JobsConfig::default()
        };
        let policy = config.retry_policy();
        assert_eq!(policy.base, Duration::from_secs(30));
        assert_eq!(policy.max_delay, Some(Duration::from_secs(600)));
    }
}
