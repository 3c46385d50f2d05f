//! Prometheus metrics exposition
//!
//! The library crates emit through the `metrics` facade:
//!
//! - `token_pool_acquisitions_total` (counter): label `family`
//! - `token_pool_rate_limited_total` (counter): label `family`
//! - `token_pool_wait_seconds` (histogram): label `family`
//! - `token_pool_disabled_total` (counter)
//! - `tweetpool_requests_total` (counter): labels `family`, `outcome`

use anyhow::{Context, Result};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Wait buckets span a sub-second retry up to a full 3-hour posting window.
const WAIT_BUCKETS: &[f64] = &[
    0.1, 1.0, 10.0, 60.0, 300.0, 900.0, 1800.0, 3600.0, 10800.0,
];

fn builder() -> Result<PrometheusBuilder> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("token_pool_wait_seconds".to_string()),
            WAIT_BUCKETS,
        )
        .context("failed to set histogram buckets")
}

/// Install the Prometheus recorder and return a handle for rendering metrics.
pub fn install_recorder() -> Result<PrometheusHandle> {
    builder()?
        .install_recorder()
        .context("failed to install Prometheus recorder")
}
