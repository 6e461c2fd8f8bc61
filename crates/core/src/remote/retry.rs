//! Retry policy for capability fetches
//!
//! Backoff applied to transport failures while obtaining a remote peer's
//! capability description. Negotiation outcomes are never retried — only
//! the fetch that precedes them.

use std::time::Duration;

/// Retry policy for failed capability fetches
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RetryPolicy {
    /// No retries
    None,

    /// Fixed number of retry attempts with constant delay
    Fixed {
        /// Number of retry attempts
        attempts: usize,
        /// Delay between retries
        delay: Duration,
    },

    /// Exponential backoff retries
    Exponential {
        /// Base delay for first retry
        base_delay: Duration,
        /// Maximum delay between retries
        max_delay: Duration,
        /// Maximum number of attempts
        max_attempts: usize,
        /// Backoff multiplier (typically 2.0)
        multiplier: f64,
    },
}

impl RetryPolicy {
    /// Create a fixed retry policy
    pub fn fixed(attempts: usize, delay: Duration) -> Self {
        RetryPolicy::Fixed { attempts, delay }
    }

    /// Create an exponential backoff policy
    pub fn exponential(max_attempts: usize) -> Self {
        RetryPolicy::Exponential {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(30),
            max_attempts,
            multiplier: 2.0,
        }
    }

    /// Get delay for a specific attempt number (0-indexed)
    pub fn delay_for_attempt(&self, attempt: usize) -> Option<Duration> {
        match self {
            RetryPolicy::None => None,
            RetryPolicy::Fixed { attempts, delay } => {
                if attempt < *attempts {
                    Some(*delay)
                } else {
                    None
                }
            }
            RetryPolicy::Exponential {
                base_delay,
                max_delay,
                max_attempts,
                multiplier,
            } => {
                if attempt >= *max_attempts {
                    return None;
                }

                let delay_ms = (base_delay.as_millis() as f64) * multiplier.powi(attempt as i32);
                let delay = Duration::from_millis(delay_ms as u64);

                Some(delay.min(*max_delay))
            }
        }
    }

    /// Get maximum number of attempts
    pub fn max_attempts(&self) -> usize {
        match self {
            RetryPolicy::None => 0,
            RetryPolicy::Fixed { attempts, .. } => *attempts,
            RetryPolicy::Exponential { max_attempts, .. } => *max_attempts,
        }
    }
}

impl Default for RetryPolicy {
    /// Default retry policy: 3 attempts with exponential backoff (100/200/400ms)
    fn default() -> Self {
        RetryPolicy::Exponential {
            base_delay: Duration::from_millis(100),
            max_delay: Duration::from_millis(400),
            max_attempts: 3,
            multiplier: 2.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_retry_policy() {
        assert_eq!(RetryPolicy::None.delay_for_attempt(0), None);
        assert_eq!(RetryPolicy::None.max_attempts(), 0);
    }

    #[test]
    fn test_fixed_policy_stops_after_attempts() {
        let policy = RetryPolicy::fixed(2, Duration::from_millis(50));
        assert_eq!(policy.delay_for_attempt(0), Some(Duration::from_millis(50)));
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(50)));
        assert_eq!(policy.delay_for_attempt(2), None);
    }

    #[test]
    fn test_exponential_policy_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for_attempt(0), Some(Duration::from_millis(100)));
        assert_eq!(policy.delay_for_attempt(1), Some(Duration::from_millis(200)));
        assert_eq!(policy.delay_for_attempt(2), Some(Duration::from_millis(400)));
        assert_eq!(policy.delay_for_attempt(3), None);

        let capped = RetryPolicy::Exponential {
            base_delay: Duration::from_millis(300),
            max_delay: Duration::from_millis(400),
            max_attempts: 5,
            multiplier: 2.0,
        };
        assert_eq!(capped.delay_for_attempt(3), Some(Duration::from_millis(400)));
    }
}
