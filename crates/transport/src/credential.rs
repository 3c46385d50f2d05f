//! Consumer and access-token credentials

use common::Secret;

/// Application (consumer) key pair. Required to construct a signer.
#[derive(Debug, Clone)]
pub struct Consumer {
    key: String,
    secret: Secret<String>,
}

impl Consumer {
    pub fn new(key: impl Into<String>, secret: impl Into<Secret<String>>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &Secret<String> {
        &self.secret
    }
}

/// A single access-token/secret pair usable to authenticate one call.
///
/// Immutable once built; the pool hands out clones.
#[derive(Debug, Clone)]
pub struct Credential {
    key: String,
    secret: Secret<String>,
}

impl Credential {
    pub fn new(key: impl Into<String>, secret: impl Into<Secret<String>>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &Secret<String> {
        &self.secret
    }
}
