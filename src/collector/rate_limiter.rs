//! Client-side rate limiter for remote books requests
//!
//! GCRA via the governor crate. Requests queue for up to the configured
//! timeout, then fail with a retryable error.

use crate::error::SourceError;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter as GovernorRateLimiter,
};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Default queue timeout before a request is rejected
const QUEUE_TIMEOUT_SECS: u64 = 30;

/// Poll interval while waiting for a permit
const POLL_INTERVAL_MS: u64 = 50;

pub struct RequestLimiter {
    limiter: GovernorRateLimiter<NotKeyed, InMemoryState, DefaultClock>,
    queue_timeout: Duration,
}

impl RequestLimiter {
    /// Limit to `requests_per_second` (clamped to at least 1)
    pub fn per_second(requests_per_second: u32) -> Self {
        Self::with_timeout(requests_per_second, Duration::from_secs(QUEUE_TIMEOUT_SECS))
    }

    pub fn with_timeout(requests_per_second: u32, queue_timeout: Duration) -> Self {
        let per_second = NonZeroU32::new(requests_per_second).unwrap_or(NonZeroU32::MIN);
        let quota = Quota::per_second(per_second);
        Self {
            limiter: GovernorRateLimiter::direct(quota),
            queue_timeout,
        }
    }

    /// Wait for permission to send one request
    pub async fn wait(&self) -> Result<(), SourceError> {
        if self.limiter.check().is_ok() {
            return Ok(());
        }
        debug!("Books request queued behind rate limit");

        let waited = timeout(self.queue_timeout, async {
            while self.limiter.check().is_err() {
                tokio::time::sleep(Duration::from_millis(POLL_INTERVAL_MS)).await;
            }
        })
        .await;

        waited.map_err(|_| {
            warn!(
                timeout_ms = self.queue_timeout.as_millis() as u64,
                "Books request rate limit queue timeout"
            );
            SourceError::RateLimited(format!(
                "queued longer than {}ms",
                self.queue_timeout.as_millis()
            ))
        })
    }

    /// Non-blocking check
    pub fn check_immediate(&self) -> bool {
        self.limiter.check().is_ok()
    }
}
