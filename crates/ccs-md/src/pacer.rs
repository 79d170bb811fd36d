//! Minimum inter-request spacing for upstream calls.
//!
//! The pacer is plain state owned by the run context; nothing here is global.
//! The delay is fixed: if the previous request was issued less than
//! `min_interval` ago, wait out the remainder. No retries, no backoff.

use std::time::{Duration, Instant};

use tracing::info;

use crate::provider::{FetchError, RawPayload, UpstreamProvider};

/// Upstream asks for at least this much time between requests.
pub const DEFAULT_MIN_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Clone)]
pub struct RequestPacer {
    min_interval: Duration,
    last_request: Option<Instant>,
    requests_issued: u64,
}

impl RequestPacer {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_request: None,
            requests_issued: 0,
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    pub fn requests_issued(&self) -> u64 {
        self.requests_issued
    }

    pub fn last_request(&self) -> Option<Instant> {
        self.last_request
    }

    /// How long a request issued at `now` would have to wait.
    pub fn wait_duration(&self, now: Instant) -> Duration {
        match self.last_request {
            None => Duration::ZERO,
            Some(last) => self
                .min_interval
                .saturating_sub(now.saturating_duration_since(last)),
        }
    }

    /// Sleep until the next request is allowed.
    pub async fn pace(&self) {
        let wait = self.wait_duration(Instant::now());
        if !wait.is_zero() {
            info!(
                wait_ms = wait.as_millis() as u64,
                "sleeping before upstream request"
            );
            tokio::time::sleep(wait).await;
        }
    }

    /// Record that a request was just issued.
    pub fn mark(&mut self, at: Instant) {
        self.last_request = Some(at);
        self.requests_issued += 1;
    }
}

impl Default for RequestPacer {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_INTERVAL)
    }
}

/// Pace, fetch once, record the request. Errors propagate unchanged.
pub async fn paced_fetch<P>(provider: &P, pacer: &mut RequestPacer) -> Result<RawPayload, FetchError>
where
    P: UpstreamProvider + ?Sized,
{
    pacer.pace().await;
    let result = provider.fetch_current().await;
    // Failed requests count toward spacing too.
    pacer.mark(Instant::now());
    result
}
