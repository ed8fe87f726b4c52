//! Bounded retry of failing catalog fetches
//!
//! Retry state lives in the caller's loop as a plain counter; nothing here
//! recurses or sleeps.

use std::time::Duration;

use crate::catalog::FetchError;

/// Default number of retries after the first failed attempt on a page.
pub const DEFAULT_MAX_RETRIES: u32 = 1;

/// Default cool-down before a retry. Kept long so a throttled or restarting
/// API has time to recover.
pub const DEFAULT_RETRY_COOLDOWN: Duration = Duration::from_secs(60);

/// How a failure should be treated
///
/// Exhaustion of a result set is not a failure: the catalog client reports
/// it as [`crate::catalog::FetchOutcome::Exhausted`], so it never reaches
/// the policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Network, throttling or server-side trouble; worth another attempt
    Transient,
    /// Bad credentials or a malformed request; aborts the worker
    Fatal,
}

/// What the fetch loop should do next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Sleep for the cool-down, then repeat the same request
    RetryAfter(Duration),
    /// Retry budget spent; mark the shard finished and move on
    GiveUp,
    /// Stop the worker process
    Abort,
}

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    max_retries: u32,
    cooldown: Duration,
}

impl RetryPolicy {
    pub fn new(max_retries: u32, cooldown: Duration) -> Self {
        Self {
            max_retries,
            cooldown,
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    pub fn classify(error: &FetchError) -> FailureClass {
        match error {
            FetchError::Unauthorized { .. } | FetchError::InvalidRequest(_) => FailureClass::Fatal,
            FetchError::Network(_)
            | FetchError::Timeout
            | FetchError::RateLimited
            | FetchError::Server { .. }
            | FetchError::Decode(_) => FailureClass::Transient,
        }
    }

    /// Decide the next step after a failed attempt.
    ///
    /// `retries_so_far` counts retries already spent on the current page, so
    /// a page is attempted at most `max_retries + 1` times.
    pub fn decide(&self, retries_so_far: u32, error: &FetchError) -> RetryDecision {
        match Self::classify(error) {
            FailureClass::Fatal => RetryDecision::Abort,
            FailureClass::Transient if retries_so_far < self.max_retries => {
                RetryDecision::RetryAfter(self.cooldown)
            }
            FailureClass::Transient => RetryDecision::GiveUp,
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_RETRIES, DEFAULT_RETRY_COOLDOWN)
    }
}
