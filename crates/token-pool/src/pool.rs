//! Ordered credential pool
//!
//! Credentials are keyed by an opaque identity (the owning user id) and kept in
//! insertion order, which is the default rotation order. The pool is frozen by
//! `finalize`; adding afterwards fails so a rotation in progress never sees
//! the pool change underneath it.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};
use transport::Credential;

use crate::error::{Error, Result};

/// Runtime status of a pooled credential.
///
/// Transitions:
/// - Available → Disabled (credential rejected by the remote)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialStatus {
    Available,
    Disabled,
}

impl CredentialStatus {
    pub fn label(&self) -> &'static str {
        match self {
            CredentialStatus::Available => "available",
            CredentialStatus::Disabled => "disabled",
        }
    }
}

#[derive(Debug)]
pub(crate) struct PoolEntry {
    pub(crate) id: String,
    pub(crate) credential: Credential,
    pub(crate) status: CredentialStatus,
    pub(crate) pinned: bool,
    /// Serializes pinned calls on this credential.
    pub(crate) exclusive: Arc<tokio::sync::Mutex<()>>,
}

#[derive(Debug, Default)]
pub struct CredentialPool {
    entries: Vec<PoolEntry>,
    positions: HashMap<String, usize>,
    finalized: bool,
}

impl CredentialPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a pool from `(identity, credential)` pairs in rotation order.
    pub fn from_entries(entries: impl IntoIterator<Item = (String, Credential)>) -> Result<Self> {
        let mut pool = Self::new();
        for (id, credential) in entries {
            pool.add(id, credential)?;
        }
        Ok(pool)
    }

    /// Append a credential. Fails once the pool is finalized or if the
    /// identity is already present.
    pub fn add(&mut self, id: impl Into<String>, credential: Credential) -> Result<()> {
        let id = id.into();
        if self.finalized {
            return Err(Error::Configuration(format!(
                "cannot add credential {id}: pool is already in use"
            )));
        }
        if self.positions.contains_key(&id) {
            return Err(Error::Configuration(format!(
                "credential {id} is already in the pool"
            )));
        }
        self.positions.insert(id.clone(), self.entries.len());
        debug!(credential_id = %id, "credential added to pool");
        self.entries.push(PoolEntry {
            id,
            credential,
            status: CredentialStatus::Available,
            pinned: false,
            exclusive: Arc::new(tokio::sync::Mutex::new(())),
        });
        Ok(())
    }

    /// Freeze the pool. Idempotent.
    pub fn finalize(&mut self) {
        if !self.finalized {
            self.finalized = true;
            info!(credentials = self.entries.len(), "credential pool finalized");
        }
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Identities in rotation order.
    pub fn ids(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.id.clone()).collect()
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn status(&self, id: &str) -> Option<CredentialStatus> {
        self.position(id).map(|p| self.entries[p].status)
    }

    pub(crate) fn entry(&self, position: usize) -> &PoolEntry {
        &self.entries[position]
    }

    pub(crate) fn entry_mut(&mut self, position: usize) -> &mut PoolEntry {
        &mut self.entries[position]
    }

    pub(crate) fn entries(&self) -> &[PoolEntry] {
        &self.entries
    }
}
