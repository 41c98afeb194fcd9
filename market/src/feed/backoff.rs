use std::time::Duration;

/// Exponential reconnect backoff.
///
/// Delays grow as `initial * 2^attempt`, capped at `max`.
/// `max_attempts = None` retries forever.
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    max_delay: Duration,
    max_attempts: Option<usize>,
}

impl Default for ExponentialBackoff {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(60), None)
    }
}

impl ExponentialBackoff {
    pub fn new(initial_delay: Duration, max_delay: Duration, max_attempts: Option<usize>) -> Self {
        Self {
            initial_delay,
            max_delay,
            max_attempts,
        }
    }

    /// Delay before reconnect attempt `attempt` (0-indexed), or `None` to give up.
    pub fn next_delay(&self, attempt: usize) -> Option<Duration> {
        if !self.should_reconnect(attempt) {
            return None;
        }

        let factor = 1u64.checked_shl(attempt.min(32) as u32).unwrap_or(u64::MAX);
        let delay_ms = (self.initial_delay.as_millis() as u64).saturating_mul(factor);
        Some(Duration::from_millis(
            delay_ms.min(self.max_delay.as_millis() as u64),
        ))
    }

    pub fn should_reconnect(&self, attempt: usize) -> bool {
        self.max_attempts.is_none_or(|max| attempt < max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delays_double_until_capped() {
        let b = ExponentialBackoff::new(Duration::from_secs(1), Duration::from_secs(10), None);

        assert_eq!(b.next_delay(0), Some(Duration::from_secs(1)));
        assert_eq!(b.next_delay(1), Some(Duration::from_secs(2)));
        assert_eq!(b.next_delay(3), Some(Duration::from_secs(8)));
        assert_eq!(b.next_delay(4), Some(Duration::from_secs(10)));
        assert_eq!(b.next_delay(500), Some(Duration::from_secs(10)));
    }

    #[test]
    fn bounded_attempts_give_up() {
        let b = ExponentialBackoff::new(Duration::from_millis(10), Duration::from_secs(1), Some(2));

        assert!(b.next_delay(1).is_some());
        assert!(b.next_delay(2).is_none());
    }

    #[test]
    fn default_retries_forever() {
        let b = ExponentialBackoff::default();
        assert!(b.should_reconnect(10_000));
        assert_eq!(b.next_delay(10_000), Some(Duration::from_secs(60)));
    }
}
