use std::time::Duration;
use serde::{Deserialize, Serialize};

use crate::device::constants::{RECONNECT_BACKOFF_INITIAL, RECONNECT_BACKOFF_MAX};

/// Decides when, and whether, to retry after the link to the selected peripheral is lost.
///
/// The first attempt is immediate. Each further attempt waits twice as long as the one before,
/// starting at `backoff_initial_ms` and capped at `backoff_max_ms`. Without `max_attempts` the
/// session keeps retrying forever.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ReconnectPolicy {
    pub max_attempts: Option<u32>,
    pub backoff_initial_ms: u64,
    pub backoff_max_ms: u64,
}

impl ReconnectPolicy {
    /// Delay before `attempt` (1-based), or `None` once the policy is exhausted.
    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if let Some(max_attempts) = self.max_attempts {
            if attempt > max_attempts {
                return None;
            }
        }

        if attempt <= 1 {
            return Some(Duration::ZERO);
        }

        let exponent = (attempt - 2).min(31);
        let delay = self
            .backoff_initial_ms
            .saturating_mul(1u64 << exponent)
            .min(self.backoff_max_ms.max(self.backoff_initial_ms));

        Some(Duration::from_millis(delay))
    }
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        ReconnectPolicy {
            max_attempts: None,
            backoff_initial_ms: RECONNECT_BACKOFF_INITIAL,
            backoff_max_ms: RECONNECT_BACKOFF_MAX,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_attempt_is_immediate() {
        assert_eq!(ReconnectPolicy::default().delay_for(1), Some(Duration::ZERO));
    }

    #[test]
    fn backoff_doubles_until_cap() {
        let policy = ReconnectPolicy {
            max_attempts: None,
            backoff_initial_ms: 1000,
            backoff_max_ms: 5000,
        };

        assert_eq!(policy.delay_for(2), Some(Duration::from_millis(1000)));
        assert_eq!(policy.delay_for(3), Some(Duration::from_millis(2000)));
        assert_eq!(policy.delay_for(4), Some(Duration::from_millis(4000)));
        assert_eq!(policy.delay_for(5), Some(Duration::from_millis(5000)));
        assert_eq!(policy.delay_for(200), Some(Duration::from_millis(5000)));
    }

    #[test]
    fn unbounded_by_default() {
        assert!(ReconnectPolicy::default().delay_for(10_000).is_some());
    }

    #[test]
    fn exhausted_after_max_attempts() {
        let policy = ReconnectPolicy {
            max_attempts: Some(2),
            ..ReconnectPolicy::default()
        };

        assert!(policy.delay_for(2).is_some());
        assert_eq!(policy.delay_for(3), None);
    }

    #[test]
    fn zero_attempts_never_reconnects() {
        let policy = ReconnectPolicy {
            max_attempts: Some(0),
            ..ReconnectPolicy::default()
        };

        assert_eq!(policy.delay_for(1), None);
    }
}
