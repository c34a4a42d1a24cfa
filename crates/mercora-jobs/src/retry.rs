//! Backoff policy for failed attempts.

use chrono::{DateTime, Duration as ChronoDuration, Utc};
use std::time::Duration;

/// Exponential backoff policy: `base * 2^attempts`.
///
/// With the default one-minute base, a job that has failed once becomes
/// eligible again two minutes later, four minutes after the second
/// failure, and so on. Production behavior leaves the delay uncapped;
/// `max_delay` exists for deployments that want an upper bound and is off
/// by default.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Delay unit for the first retry.
    pub base: Duration,

    /// Optional ceiling on the computed delay.
    pub max_delay: Option<Duration>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base: Duration::from_secs(60),
            max_delay: None,
        }
    }
}

impl RetryPolicy {
    /// Creates a policy with the given base delay and no cap.
    #[must_use]
    pub const fn new(base: Duration) -> Self {
        Self {
            base,
            max_delay: None,
        }
    }

    /// Sets a ceiling on the computed delay.
    #[must_use]
    pub const fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    /// Computes the delay before the next attempt, given how many
    /// attempts have already been consumed.
    #[must_use]
    pub fn backoff(&self, attempts: u32) -> Duration {
        let factor = 2u64.checked_pow(attempts).unwrap_or(u64::MAX);
        let delay = self
            .base
            .as_secs()
            .checked_mul(factor)
            .map_or(Duration::MAX, Duration::from_secs);

        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Returns the instant at which a job that has consumed `attempts`
    /// attempts becomes eligible again.
    #[must_use]
    pub fn next_run_at(&self, now: DateTime<Utc>, attempts: u32) -> DateTime<Utc> {
        let delay = ChronoDuration::from_std(self.backoff(attempts)).unwrap_or(ChronoDuration::MAX);
        now.checked_add_signed(delay).unwrap_or(DateTime::<Utc>::MAX_UTC)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(0), Duration::from_secs(60));
        assert_eq!(policy.backoff(1), Duration::from_secs(120));
        assert_eq!(policy.backoff(2), Duration::from_secs(240));
        assert_eq!(policy.backoff(3), Duration::from_secs(480));
    }

    #[test]
    fn test_backoff_uncapped_by_default() {
        let policy = RetryPolicy::default();
        // 60s * 2^20 is far past 24h
        assert!(policy.backoff(20) > Duration::from_secs(86_400));
    }

    #[test]
    fn test_backoff_respects_cap() {
        let policy = RetryPolicy::default().with_max_delay(Duration::from_secs(3_600));
        assert_eq!(policy.backoff(0), Duration::from_secs(60));
        assert_eq!(policy.backoff(10), Duration::from_secs(3_600));
    }

    #[test]
    fn test_backoff_does_not_overflow() {
        let policy = RetryPolicy::default();
        let huge = policy.backoff(u32::MAX);
        assert!(huge >= policy.backoff(62));
    }

    #[test]
    fn test_next_run_at() {
        let policy = RetryPolicy::default();
        let now = Utc::now();
        let next = policy.next_run_at(now, 1);
        assert_eq!(next - now, ChronoDuration::seconds(120));
    }
}
