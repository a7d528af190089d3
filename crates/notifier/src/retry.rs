//! Retry state machine.
//!
//! `attempting → delivered | retrying → attempting | failed-terminal`.
//! The worker owns the transition; this module only decides it.

use std::time::Duration;

/// What happens after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Wait `backoff`, then try again as `next_attempt`.
    Retry { next_attempt: u32, backoff: Duration },
    /// Attempt cap reached; the notification is dropped.
    Exhausted,
}

/// Exponential backoff with an attempt cap.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Attempts per job, the first one included.
    pub max_retries: u32,
    /// Attempt N waits `2^(N-1)` of these before the next attempt.
    pub backoff_unit: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, backoff_unit: Duration) -> Self {
        Self {
            max_retries: max_retries.max(1),
            backoff_unit,
        }
    }

    /// Backoff applied after attempt `attempt` fails.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.backoff_unit.saturating_mul(1u32 << exponent)
    }

    /// Decide the transition after attempt `attempt` failed.
    pub fn next(&self, attempt: u32) -> Transition {
        if attempt >= self.max_retries {
            Transition::Exhausted
        } else {
            Transition::Retry {
                next_attempt: attempt + 1,
                backoff: self.backoff(attempt),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_secs(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles() {
        let policy = RetryPolicy::new(5, Duration::from_secs(1));
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(4), Duration::from_secs(8));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::new(u32::MAX, Duration::from_secs(u64::MAX / 2));
        assert_eq!(policy.backoff(40), Duration::MAX);
    }

    #[test]
    fn test_transitions_until_exhausted() {
        let policy = RetryPolicy::new(3, Duration::from_millis(10));
        assert_eq!(
            policy.next(1),
            Transition::Retry {
                next_attempt: 2,
                backoff: Duration::from_millis(10)
            }
        );
        assert_eq!(
            policy.next(2),
            Transition::Retry {
                next_attempt: 3,
                backoff: Duration::from_millis(20)
            }
        );
        assert_eq!(policy.next(3), Transition::Exhausted);
    }

    #[test]
    fn test_attempts_never_exceed_cap() {
        for cap in 1..6 {
            let policy = RetryPolicy::new(cap, Duration::ZERO);
            let mut attempt = 1;
            while let Transition::Retry { next_attempt, .. } = policy.next(attempt) {
                assert_eq!(next_attempt, attempt + 1);
                attempt = next_attempt;
            }
            assert_eq!(attempt, cap);
        }
    }

    #[test]
    fn test_single_attempt_policy() {
        let policy = RetryPolicy::new(0, Duration::ZERO);
        assert_eq!(policy.max_retries, 1);
        assert_eq!(policy.next(1), Transition::Exhausted);
    }
}
