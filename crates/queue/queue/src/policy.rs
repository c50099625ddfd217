use std::time::Duration;

/// Retry behavior for failed job deliveries.
///
/// Delays grow exponentially: `initial_backoff * 2^attempt`, capped at
/// `max_backoff`. `attempt` counts completed deliveries, so the first
/// retry waits `initial_backoff`.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total delivery attempts before a job is dead-lettered.
    pub max_attempts: u32,
    /// Delay before the first retry.
    pub initial_backoff: Duration,
    /// Upper bound on any computed backoff.
    pub max_backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Backoff before re-delivering a job whose delivery number
    /// `attempt` (0-based) just failed.
    #[must_use]
    pub fn backoff_for(&self, attempt: u32) -> Duration {
        let shift = attempt.min(31);
        let delay = self.initial_backoff.saturating_mul(1u32 << shift);
        delay.min(self.max_backoff)
    }

    /// True if a job that has completed `attempts` deliveries is out of
    /// retries.
    #[must_use]
    pub fn is_exhausted(&self, attempts: u32) -> bool {
        attempts >= self.max_attempts
    }
}

/// Bounded retention of finished jobs, kept for observability.
#[derive(Debug, Clone)]
pub struct RetentionPolicy {
    /// Maximum completed-job records to retain.
    pub max_completed: usize,
    /// Maximum dead-lettered job records to retain.
    pub max_failed: usize,
    /// Age bound on completed-job records.
    pub completed_ttl: Duration,
}

impl Default for RetentionPolicy {
    fn default() -> Self {
        Self {
            max_completed: 1_000,
            max_failed: 5_000,
            completed_ttl: Duration::from_secs(24 * 60 * 60),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_for(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_for(2), Duration::from_secs(4));
    }

    #[test]
    fn backoff_capped_at_max() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_for(10), Duration::from_secs(60));
        // Shift widths beyond 31 must not panic.
        assert_eq!(policy.backoff_for(u32::MAX), Duration::from_secs(60));
    }

    #[test]
    fn exhaustion_threshold() {
        let policy = RetryPolicy::default();
        assert!(!policy.is_exhausted(2));
        assert!(policy.is_exhausted(3));
        assert!(policy.is_exhausted(4));
    }
}
