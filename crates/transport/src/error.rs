//! Transport errors

use crate::ErrorClassification;
use crate::quota::{QuotaHeaders, classify_status};

/// Errors from executing a request against the remote API.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("remote returned {status}: {body}")]
    Status {
        status: u16,
        body: String,
        quota: Option<QuotaHeaders>,
    },

    #[error("request failed: {0}")]
    Request(String),

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl TransportError {
    /// Classify this failure for the credential pool.
    pub fn classification(&self) -> ErrorClassification {
        match self {
            TransportError::Status { status, body, .. } => classify_status(*status, body),
            TransportError::Request(_) => ErrorClassification::Transient,
            TransportError::Decode(_) => ErrorClassification::Rejected,
        }
    }

    /// Quota headers reported alongside the failure, if any.
    pub fn quota(&self) -> Option<&QuotaHeaders> {
        match self {
            TransportError::Status { quota, .. } => quota.as_ref(),
            _ => None,
        }
    }
}

/// Result alias for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;
