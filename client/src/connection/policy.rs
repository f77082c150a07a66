use std::time::Duration;

/// Bounded linear backoff: the Nth retry waits `min(delay_step * N, max_delay)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectPolicy {
    pub max_attempts: u32,
    pub delay_step: Duration,
    pub max_delay: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            delay_step: Duration::from_millis(2000),
            max_delay: Duration::from_millis(10_000),
        }
    }
}

impl ReconnectPolicy {
    /// Delay before retry number `attempt` (starting at 1).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.delay_step
            .checked_mul(attempt)
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_linear_delays() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.delay_for(1), Duration::from_millis(2000));
        assert_eq!(policy.delay_for(2), Duration::from_millis(4000));
        assert_eq!(policy.delay_for(3), Duration::from_millis(6000));
    }

    #[test]
    fn test_delay_is_capped() {
        let policy = ReconnectPolicy::default();

        assert_eq!(policy.delay_for(5), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(50), Duration::from_millis(10_000));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_millis(10_000));
    }
}
