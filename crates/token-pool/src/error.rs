//! Error types for pool operations

use std::time::Duration;

/// Errors from pool operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rate limit exceeded for {family}, next reset in {}s", wait.as_secs())]
    RateLimited { family: String, wait: Duration },

    #[error("pool exhausted: {0}")]
    PoolExhausted(String),

    #[error("credential {0} is pinned by another call")]
    CredentialBusy(String),

    #[error("credential not found: {0}")]
    NotFound(String),

    #[error("access token file error: {0}")]
    TokenFile(String),
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
