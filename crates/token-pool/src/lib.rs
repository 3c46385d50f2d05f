//! Access-token pool with per-endpoint rate-limit bookkeeping
//!
//! Spreads one API's per-credential quotas across many access tokens. The pool
//! keeps credentials in insertion order; the tracker keeps one rate window per
//! (credential, endpoint family) and decides which credential serves the next
//! call.
//!
//! Call lifecycle:
//! 1. Credentials are added, then the pool is finalized by the first acquire or pin
//! 2. `acquire(family)` picks the next credential round-robin whose window has
//!    quota left and reserves one unit
//! 3. The caller executes the request and hands the lease back via `record`
//!    (server quota headers win over the local reservation) or `report_error`
//! 4. A 429 zeroes the window until reset; a rejected credential is disabled
//! 5. When nothing is eligible the tracker either sleeps until the earliest
//!    reset or fails with the wait time, depending on configuration
//!
//! `pin(identity)` reserves one credential for a single logical call; pinned
//! credentials are skipped by rotation until the guard is dropped.

pub mod credentials;
pub mod error;
pub mod pool;
pub mod tracker;
pub mod window;

pub use credentials::load_access_tokens;
pub use error::{Error, Result};
pub use pool::{CredentialPool, CredentialStatus};
pub use tracker::{Lease, PinGuard, RateLimitTracker, TrackerConfig};
pub use window::{DEFAULT_PERIOD, FamilyLimit, RateWindow};
