//! Minimum-interval pacing of catalog API calls
//!
//! Each worker has its own API credential and quota, so pacing is local to
//! one worker's sequential flow and never coordinated across processes.

use std::time::Duration;
use tokio::time::{sleep_until, Instant};

/// Default spacing between catalog calls: a little over one call per second.
pub const DEFAULT_MIN_CALL_INTERVAL: Duration = Duration::from_millis(1001);

/// Enforces a minimum interval between consecutive outbound calls
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_turn: Option<Instant>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_turn: None,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until at least `min_interval` has passed since the previous turn
    /// was granted, then grant this one.
    ///
    /// A call that completed quickly leaves the remainder of the interval to
    /// be slept here; a slow call leaves nothing to wait for. Retries go
    /// through the same gate, so the bound holds under retries too.
    pub async fn wait_turn(&mut self) {
        if let Some(last) = self.last_turn {
            let ready_at = last + self.min_interval;
            if ready_at > Instant::now() {
                tracing::trace!(
                    wait_ms = (ready_at - Instant::now()).as_millis() as u64,
                    "Pacing catalog call"
                );
                sleep_until(ready_at).await;
            }
        }
        self.last_turn = Some(Instant::now());
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_CALL_INTERVAL)
    }
}
