//! Rate-limit snapshots from the live API.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Remaining quota and reset time reported by the live API.
///
/// Captured when a request is rejected for rate limiting, so errors and log
/// lines can say when retrying becomes useful again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitInfo {
    remaining: u32,
    reset_at: u64,
}

impl RateLimitInfo {
    /// Creates a snapshot from the API's remaining count and reset epoch.
    #[must_use]
    pub const fn new(remaining: u32, reset_at: u64) -> Self {
        Self { remaining, reset_at }
    }

    /// Remaining requests in the current window.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Unix timestamp when the window resets.
    #[must_use]
    pub const fn reset_at(&self) -> u64 {
        self.reset_at
    }

    /// Seconds until the window resets; zero when already past.
    #[must_use]
    pub fn seconds_until_reset(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|duration| duration.as_secs())
            .unwrap_or(0);
        self.reset_at.saturating_sub(now)
    }
}

impl fmt::Display for RateLimitInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{remaining} requests remaining, resets at {reset_at}",
            remaining = self.remaining,
            reset_at = self.reset_at
        )
    }
}
