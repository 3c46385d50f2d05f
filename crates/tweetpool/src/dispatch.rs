//! One remote call through the pool: acquire, execute, settle the lease

use std::sync::Arc;

use token_pool::{PinGuard, RateLimitTracker};
use tracing::{debug, warn};
use transport::{ApiRequest, ErrorClassification, RawResponse, Transport};

use crate::error::Result;

/// Consecutive remote 429s one call tolerates, per credential in the pool.
/// Each credential gets one try before and one after its window resets.
const RATE_LIMITED_TRIES_PER_CREDENTIAL: usize = 2;

pub(crate) struct Dispatcher {
    transport: Arc<dyn Transport>,
    tracker: Arc<RateLimitTracker>,
}

impl Dispatcher {
    pub(crate) fn new(transport: Arc<dyn Transport>, tracker: Arc<RateLimitTracker>) -> Self {
        Self { transport, tracker }
    }

    pub(crate) fn tracker(&self) -> &Arc<RateLimitTracker> {
        &self.tracker
    }

    /// Execute `request` with a rotating credential, or with the pinned one
    /// when `pin` is set.
    ///
    /// A 429 spends the serving credential's window and the call is retried on
    /// the next eligible credential; when none is left the tracker's wait/fail
    /// policy applies. A call that keeps drawing 429s gives up with the last
    /// one. Every other failure is returned as is.
    pub(crate) async fn call(&self, request: &ApiRequest, pin: Option<&PinGuard>) -> Result<RawResponse> {
        let family = request.endpoint.family;
        let max_rate_limited = match pin {
            Some(_) => RATE_LIMITED_TRIES_PER_CREDENTIAL,
            None => self.tracker.len().max(1) * RATE_LIMITED_TRIES_PER_CREDENTIAL,
        };
        let mut rate_limited = 0;
        loop {
            let lease = match pin {
                Some(pin) => self.tracker.acquire_pinned(pin, family).await?,
                None => self.tracker.acquire(family).await?,
            };
            let credential_id = lease.credential_id().to_string();

            match self.transport.execute(lease.credential(), request).await {
                Ok(response) => {
                    self.tracker.record(lease, response.quota.as_ref());
                    metrics::counter!("tweetpool_requests_total", "family" => family, "outcome" => "ok")
                        .increment(1);
                    debug!(credential_id, family, "call succeeded");
                    return Ok(response);
                }
                Err(err) => {
                    let classification = err.classification();
                    self.tracker.report_error(lease, classification, err.quota());
                    metrics::counter!("tweetpool_requests_total", "family" => family, "outcome" => "error")
                        .increment(1);
                    if classification == ErrorClassification::QuotaExceeded {
                        rate_limited += 1;
                        if rate_limited < max_rate_limited {
                            warn!(credential_id, family, rate_limited, "remote rate limited credential, rotating");
                            continue;
                        }
                        warn!(credential_id, family, rate_limited, "remote keeps rate limiting, giving up");
                    }
                    warn!(credential_id, family, error = %err, "call failed");
                    return Err(err.into());
                }
            }
        }
    }
}
