//! Transport-level retry policy with exponential backoff

use crate::error::AppError;
use crate::models::{config::seconds, Config};
use std::time::Duration;

/// Statuses worth another try: throttling and transient gateway failures
pub const DEFAULT_RETRYABLE_STATUSES: [u16; 5] = [429, 500, 502, 503, 504];

/// Retry policy applied inside the HTTP transport
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries allowed after the first request
    pub max_retries: u32,
    /// Delay before the first retry; doubles for each subsequent one
    pub backoff_factor: Duration,
    /// Upper bound on a single backoff sleep
    pub max_backoff: Duration,
    /// Response statuses that trigger a retry
    pub retryable_statuses: Vec<u16>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: crate::defaults::DEFAULT_MAX_RETRIES,
            backoff_factor: seconds(crate::defaults::DEFAULT_BACKOFF_FACTOR),
            max_backoff: Duration::from_secs(5),
            retryable_statuses: DEFAULT_RETRYABLE_STATUSES.to_vec(),
        }
    }
}

impl From<&Config> for RetryPolicy {
    fn from(config: &Config) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_factor: seconds(config.backoff_factor),
            ..Default::default()
        }
    }
}

impl RetryPolicy {
    /// Policy that never retries
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            ..Default::default()
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_backoff(mut self, backoff_factor: Duration, max_backoff: Duration) -> Self {
        self.backoff_factor = backoff_factor;
        self.max_backoff = max_backoff;
        self
    }

    /// Whether a response status should be retried
    pub fn is_retryable_status(&self, status: u16) -> bool {
        self.retryable_statuses.contains(&status)
    }

    /// Whether a failed request should be retried
    ///
    /// Connection failures are retried. Timeouts are not: a timed-out
    /// request already consumed the whole attempt deadline.
    pub fn is_retryable_error(&self, error: &AppError) -> bool {
        matches!(error, AppError::Connection(_))
    }

    /// Whether another retry is allowed after `retries_done` retries
    pub fn can_retry(&self, retries_done: u32) -> bool {
        retries_done < self.max_retries
    }

    /// Sleep before retry number `retry` (1-based): `backoff_factor * 2^(retry-1)`
    pub fn backoff(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let multiplier = 1u32 << (retry - 1).min(16);
        self.backoff_factor.saturating_mul(multiplier).min(self.max_backoff)
    }
}
