//! Attempt budget and backoff for ingestions.

use crate::error::Error;
use crate::model::IngestAttempt;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first. Must be > 0.
    pub max_attempts: u32,
    /// Base delay; the wait after attempt `n` is `backoff * n`.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 2,
            backoff: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    pub fn first_attempt(&self) -> IngestAttempt {
        IngestAttempt::first(self.max_attempts)
    }

    /// The attempt to run after `failed` ended with `error`, if any.
    pub fn next_attempt(&self, failed: IngestAttempt, error: &Error) -> Option<IngestAttempt> {
        if error.is_retryable() {
            failed.next()
        } else {
            None
        }
    }

    /// How long to wait after the given failed attempt.
    pub fn delay(&self, failed: IngestAttempt) -> Duration {
        self.backoff.saturating_mul(failed.number)
    }
}
