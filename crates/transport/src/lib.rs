//! Transport boundary for the pooled API client
//!
//! Defines the narrow interface the client core calls through: a `Transport`
//! executes one request with one credential and hands back the decoded body
//! plus whatever quota headers the server reported. Request signing is a
//! separate `Signer` seam so the HTTP plumbing stays independent of the
//! authentication scheme.
//!
//! Quota headers are surfaced on both success and failure so the rate-limit
//! tracker can treat the server's view as authoritative whenever present.

pub mod credential;
pub mod error;
pub mod http;
pub mod quota;
pub mod request;

pub use credential::{Consumer, Credential};
pub use error::{Result, TransportError};
pub use http::{BearerSigner, HttpTransport, Signer};
pub use quota::{QuotaHeaders, classify_status};
pub use request::{ApiRequest, Endpoint, HttpMethod, RawResponse};

use std::future::Future;
use std::pin::Pin;

/// How a failed call should affect the credential that served it.
///
/// - QuotaExceeded zeroes the credential's window for the endpoint family
/// - Permanent removes the credential from rotation
/// - Transient and Rejected leave credential state untouched
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClassification {
    /// Timeouts, connection failures, 5xx
    Transient,
    /// The credential's window for this endpoint family is spent
    QuotaExceeded,
    /// The credential was rejected by the remote (revoked, suspended)
    Permanent,
    /// The request itself was refused (bad parameters, missing resource)
    Rejected,
}

/// Executes one API request on behalf of one credential.
///
/// Uses `Pin<Box<dyn Future>>` return types so the client can hold an
/// `Arc<dyn Transport>`.
pub trait Transport: Send + Sync {
    fn execute<'a>(
        &'a self,
        credential: &'a Credential,
        request: &'a ApiRequest,
    ) -> Pin<Box<dyn Future<Output = Result<RawResponse>> + Send + 'a>>;
}
