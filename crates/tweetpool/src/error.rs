//! Caller-facing error for every client operation

use std::time::Duration;

use transport::{ErrorClassification, TransportError};

/// Every failure surfaced by the client.
///
/// `reason()`, `response()` and `wait()` give callers what they need to choose
/// between retrying, backing off and aborting.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("rate limit exceeded for {family}, retry in {}s", wait.as_secs())]
    RateLimitExceeded { family: String, wait: Duration },

    #[error("no usable credential: {0}")]
    PoolExhausted(String),

    /// The user's credential is pinned by another call still in progress,
    /// such as an open home timeline stream.
    #[error("credential for {0} is in use by another call")]
    CredentialBusy(String),

    #[error("remote returned {status}: {body}")]
    Transport { status: u16, body: String },

    #[error("credential rejected by remote ({status}): {body}")]
    Auth { status: u16, body: String },

    #[error("request failed: {0}")]
    Request(String),

    #[error("malformed response: {0}")]
    Response(String),
}

impl Error {
    pub fn reason(&self) -> String {
        self.to_string()
    }

    /// Raw response body, when the remote answered.
    pub fn response(&self) -> Option<&str> {
        match self {
            Error::Transport { body, .. } | Error::Auth { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Time until quota is available again. Only set for rate-limit errors.
    pub fn wait(&self) -> Option<Duration> {
        match self {
            Error::RateLimitExceeded { wait, .. } => Some(*wait),
            _ => None,
        }
    }
}

impl From<token_pool::Error> for Error {
    fn from(err: token_pool::Error) -> Self {
        match err {
            token_pool::Error::RateLimited { family, wait } => {
                Error::RateLimitExceeded { family, wait }
            }
            token_pool::Error::PoolExhausted(reason) => Error::PoolExhausted(reason),
            token_pool::Error::CredentialBusy(user_id) => Error::CredentialBusy(user_id),
            token_pool::Error::Configuration(reason)
            | token_pool::Error::NotFound(reason)
            | token_pool::Error::TokenFile(reason) => Error::Configuration(reason),
        }
    }
}

impl From<TransportError> for Error {
    fn from(err: TransportError) -> Self {
        let classification = err.classification();
        match err {
            TransportError::Status { status, body, .. }
                if classification == ErrorClassification::Permanent =>
            {
                Error::Auth { status, body }
            }
            TransportError::Status { status, body, .. } => Error::Transport { status, body },
            TransportError::Request(reason) => Error::Request(reason),
            TransportError::Decode(reason) => Error::Response(reason),
        }
    }
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, Error>;
