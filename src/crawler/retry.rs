//! Retry policy with exponential backoff
//!
//! A failed fetch is classified as [`FailureType::Transient`] or
//! [`FailureType::Permanent`]; the [`RetryPolicy`] decides whether another
//! attempt is made within the current run. With the default single attempt a
//! failed URI simply stays `Pending` until the next run.

use crate::config::RetryConfig;
use crate::FetchError;
use std::time::Duration;

/// Classification of fetch failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureType {
    /// Timeouts, connection errors, 5xx and 429 responses
    Transient,

    /// Any other non-success status, and empty bodies
    Permanent,
}

/// Decision on whether to retry a failed fetch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryDecision {
    /// Retry after `delay`; `attempt` is the number of the next attempt
    Retry { delay: Duration, attempt: u32 },

    /// Give up on this URI for the current run
    DoNotRetry { reason: String },
}

/// Classifies a fetch error for retry purposes
pub fn classify_failure(error: &FetchError) -> FailureType {
    match error {
        FetchError::Transport { .. } => FailureType::Transient,
        FetchError::Status { status, .. } if *status == 429 || *status >= 500 => {
            FailureType::Transient
        }
        FetchError::Status { .. } | FetchError::EmptyBody { .. } => FailureType::Permanent,
    }
}

/// Retry behavior with exponential backoff
///
/// ```text
/// delay(n) = min(base_delay * multiplier^(n - 1), max_delay)
/// ```
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

impl RetryPolicy {
    /// Creates a policy; `max_attempts` is clamped to at least 1
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay,
            multiplier: 2.0,
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(config.max_attempts, config.base_delay(), config.max_delay())
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Delay before retrying after failed attempt number `attempt` (1-indexed)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31) as i32;
        let scaled = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        Duration::from_secs_f64(scaled.min(self.max_delay.as_secs_f64()))
    }

    /// Decides whether to retry after attempt number `attempt` failed
    pub fn should_retry(&self, failure_type: FailureType, attempt: u32) -> RetryDecision {
        if failure_type == FailureType::Permanent {
            return RetryDecision::DoNotRetry {
                reason: "permanent failure".to_string(),
            };
        }

        if attempt >= self.max_attempts {
            return RetryDecision::DoNotRetry {
                reason: format!("exhausted {} attempt(s)", self.max_attempts),
            };
        }

        RetryDecision::Retry {
            delay: self.delay_for(attempt),
            attempt: attempt + 1,
        }
    }
}
