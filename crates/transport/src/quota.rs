//! Quota headers and failure classification
//!
//! The remote reports the state of the per-credential, per-endpoint window on
//! every response via `x-rate-limit-*` headers. A 429 (or the legacy 420)
//! means the window is spent; 401 and a small set of account-level error codes
//! mean the credential itself is unusable.

use reqwest::header::HeaderMap;
use std::time::Duration;

const LIMIT_HEADERS: &[&str] = &["x-rate-limit-limit", "x-ratelimit-limit"];
const REMAINING_HEADERS: &[&str] = &["x-rate-limit-remaining", "x-ratelimit-remaining"];
const RESET_HEADERS: &[&str] = &["x-rate-limit-reset", "x-ratelimit-reset"];

/// Error codes in a 403 body that mean the credential, not the request, is bad.
///
/// 64: account suspended, 89: invalid or expired token, 326: account locked.
const CREDENTIAL_ERROR_CODES: &[u64] = &[64, 89, 326];

/// Authoritative window state reported by the server.
///
/// `reset_at` is a unix timestamp in seconds (absolute, as sent by the server).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuotaHeaders {
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: u64,
}

impl QuotaHeaders {
    /// Parse quota headers. Returns None unless limit, remaining and reset are
    /// all present and numeric; a partial set is not authoritative.
    pub fn from_headers(headers: &HeaderMap) -> Option<Self> {
        Some(Self {
            limit: first_number(headers, LIMIT_HEADERS)?,
            remaining: first_number(headers, REMAINING_HEADERS)?,
            reset_at: first_number(headers, RESET_HEADERS)?,
        })
    }

    /// Time left until `reset_at`, measured from `now` (unix seconds).
    pub fn reset_in(&self, now: u64) -> Duration {
        Duration::from_secs(self.reset_at.saturating_sub(now))
    }
}

fn first_number<T: std::str::FromStr>(headers: &HeaderMap, names: &[&str]) -> Option<T> {
    names.iter().find_map(|name| {
        headers
            .get(*name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
    })
}

/// Classify a failed response by HTTP status and body.
pub fn classify_status(status: u16, body: &str) -> crate::ErrorClassification {
    use crate::ErrorClassification::*;
    match status {
        420 | 429 => QuotaExceeded,
        401 => Permanent,
        403 if has_credential_error_code(body) => Permanent,
        408 | 500..=599 => Transient,
        _ => Rejected,
    }
}

fn has_credential_error_code(body: &str) -> bool {
    let Ok(json) = serde_json::from_str::<serde_json::Value>(body) else {
        return false;
    };
    json.get("errors")
        .and_then(|e| e.as_array())
        .is_some_and(|errors| {
            errors.iter().any(|e| {
                e.get("code")
                    .and_then(|c| c.as_u64())
                    .is_some_and(|code| CREDENTIAL_ERROR_CODES.contains(&code))
            })
        })
}
