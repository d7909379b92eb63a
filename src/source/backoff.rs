//! Exponential backoff policy for the live adapter.

use std::time::Duration;

/// Retry schedule applied when the live API reports rate limiting.
///
/// The delay doubles on each attempt from `base_delay` up to `max_delay`;
/// after `max_retries` attempts the adapter gives up and the run is reported
/// as incomplete, resumable from its checkpoint.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use magpie::source::BackoffPolicy;
///
/// let policy = BackoffPolicy::new(Duration::from_millis(100), Duration::from_secs(1), 3);
/// assert_eq!(policy.delay_for(0), Some(Duration::from_millis(100)));
/// assert_eq!(policy.delay_for(1), Some(Duration::from_millis(200)));
/// assert_eq!(policy.delay_for(3), None);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackoffPolicy {
    base_delay: Duration,
    max_delay: Duration,
    max_retries: u32,
}

impl BackoffPolicy {
    /// Creates a policy from a base delay, a cap, and a retry budget.
    #[must_use]
    pub const fn new(base_delay: Duration, max_delay: Duration, max_retries: u32) -> Self {
        Self {
            base_delay,
            max_delay,
            max_retries,
        }
    }

    /// Maximum number of retry attempts before giving up.
    #[must_use]
    pub const fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// Delay before retry number `attempt` (zero-based), or `None` once the
    /// retry budget is spent.
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if attempt >= self.max_retries {
            return None;
        }
        let factor = 1_u32.checked_shl(attempt).unwrap_or(u32::MAX);
        let delay = self
            .base_delay
            .checked_mul(factor)
            .unwrap_or(self.max_delay);
        Some(delay.min(self.max_delay))
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), Duration::from_secs(60), 5)
    }
}
