//! Access-token file loading
//!
//! The file is a JSON array of `{"user_id", "key", "secret"}` objects, one per
//! authorized account. Array order becomes rotation order.

use std::collections::HashSet;
use std::path::Path;

use common::Secret;
use serde::Deserialize;
use tracing::info;
use transport::Credential;

use crate::error::{Error, Result};

#[derive(Deserialize)]
struct AccessTokenEntry {
    user_id: String,
    key: String,
    secret: String,
}

/// Read `(user_id, credential)` pairs from an access-token file.
///
/// Rejects blank fields and repeated user ids so a bad file fails at startup
/// rather than at the first pinned call.
pub async fn load_access_tokens(path: &Path) -> Result<Vec<(String, Credential)>> {
    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| Error::TokenFile(format!("reading {}: {e}", path.display())))?;
    let entries: Vec<AccessTokenEntry> = serde_json::from_str(&contents)
        .map_err(|e| Error::TokenFile(format!("parsing {}: {e}", path.display())))?;

    let mut seen = HashSet::new();
    let mut tokens = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate() {
        if entry.user_id.is_empty() || entry.key.is_empty() || entry.secret.is_empty() {
            return Err(Error::TokenFile(format!(
                "entry {index} has an empty user_id, key or secret"
            )));
        }
        if !seen.insert(entry.user_id.clone()) {
            return Err(Error::TokenFile(format!(
                "user_id {} appears more than once",
                entry.user_id
            )));
        }
        let credential = Credential::new(entry.key, Secret::new(entry.secret));
        tokens.push((entry.user_id, credential));
    }

    info!(path = %path.display(), tokens = tokens.len(), "loaded access tokens");
    Ok(tokens)
}
