//! Rate-limit tracker and round-robin credential selection
//!
//! All selection and window updates happen under one mutex, so check-then-
//! reserve is atomic: two concurrent callers can never both take the last unit
//! of a window. The lock is never held across an await; waiting for a reset
//! happens outside it.
//!
//! Quota accounting: `acquire` reserves one unit locally. `record` replaces the
//! window with the server's quota headers when they are present (the server is
//! the source of truth); without headers the local reservation stands as the
//! decrement for that call. A server report for the window already held
//! locally keeps the lower remaining count, so reservations of other in-flight
//! leases survive it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use tokio::sync::OwnedMutexGuard;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use transport::{Credential, ErrorClassification, QuotaHeaders};

use crate::error::{Error, Result};
use crate::pool::{CredentialPool, CredentialStatus};
use crate::window::{DEFAULT_PERIOD, FamilyLimit, RateWindow};

/// Tracker behavior when no credential has quota left.
#[derive(Debug, Clone, Default)]
pub struct TrackerConfig {
    /// Sleep until the earliest reset instead of failing with `RateLimited`.
    pub wait_on_rate_limit: bool,
    /// Known per-credential limits keyed by endpoint family.
    pub families: HashMap<String, FamilyLimit>,
    /// How long `pin` waits for another pin of the same credential to be
    /// released before failing with `CredentialBusy`. Zero fails at once.
    pub pin_wait: Duration,
}

/// Permission to make one call with one credential against one family.
///
/// Hand it back through `record` or `report_error` once the call completes.
#[derive(Debug)]
pub struct Lease {
    position: usize,
    credential_id: String,
    credential: Credential,
    family: String,
}

impl Lease {
    pub fn credential(&self) -> &Credential {
        &self.credential
    }

    pub fn credential_id(&self) -> &str {
        &self.credential_id
    }

    pub fn family(&self) -> &str {
        &self.family
    }
}

/// Exclusive reservation of one credential for one logical call.
///
/// While the guard is alive the credential is skipped by rotation and other
/// pins of the same credential wait up to `TrackerConfig::pin_wait`. Dropping the guard releases the pin on
/// every exit path.
pub struct PinGuard {
    tracker: Arc<RateLimitTracker>,
    position: usize,
    credential_id: String,
    _exclusive: OwnedMutexGuard<()>,
}

impl PinGuard {
    pub fn credential_id(&self) -> &str {
        &self.credential_id
    }
}

impl std::fmt::Debug for PinGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PinGuard")
            .field("credential_id", &self.credential_id)
            .finish()
    }
}

impl Drop for PinGuard {
    fn drop(&mut self) {
        self.tracker.lock().pool.entry_mut(self.position).pinned = false;
        debug!(credential_id = %self.credential_id, "credential unpinned");
    }
}

struct TrackerState {
    pool: CredentialPool,
    windows: HashMap<(usize, String), RateWindow>,
    next_index: usize,
}

pub struct RateLimitTracker {
    state: Mutex<TrackerState>,
    config: TrackerConfig,
}

impl RateLimitTracker {
    pub fn new(pool: CredentialPool, config: TrackerConfig) -> Self {
        info!(
            credentials = pool.len(),
            wait_on_rate_limit = config.wait_on_rate_limit,
            "rate limit tracker initialized"
        );
        Self {
            state: Mutex::new(TrackerState {
                pool,
                windows: HashMap::new(),
                next_index: 0,
            }),
            config,
        }
    }

    /// Add a credential. Fails with `Configuration` once the pool has served
    /// its first acquire or pin.
    pub fn add_credential(&self, id: impl Into<String>, credential: Credential) -> Result<()> {
        self.lock().pool.add(id, credential)
    }

    pub fn len(&self) -> usize {
        self.lock().pool.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Select an eligible credential for `family` by rotation and reserve one
    /// unit of its quota.
    pub async fn acquire(&self, family: &str) -> Result<Lease> {
        self.acquire_with(family, None).await
    }

    /// Reserve one unit of quota on the pinned credential only.
    pub async fn acquire_pinned(&self, pin: &PinGuard, family: &str) -> Result<Lease> {
        self.acquire_with(family, Some(pin.position)).await
    }

    async fn acquire_with(&self, family: &str, pinned: Option<usize>) -> Result<Lease> {
        let started = Instant::now();
        loop {
            match self.try_acquire(family, pinned) {
                Ok(lease) => {
                    metrics::counter!("token_pool_acquisitions_total", "family" => family.to_string())
                        .increment(1);
                    let waited = started.elapsed();
                    if !waited.is_zero() {
                        metrics::histogram!("token_pool_wait_seconds", "family" => family.to_string())
                            .record(waited.as_secs_f64());
                    }
                    return Ok(lease);
                }
                Err(Error::RateLimited { wait, .. }) if self.config.wait_on_rate_limit => {
                    warn!(
                        family,
                        wait_secs = wait.as_secs(),
                        "no credential has quota left, waiting for reset"
                    );
                    tokio::time::sleep(wait).await;
                }
                Err(e) => {
                    if matches!(e, Error::RateLimited { .. }) {
                        metrics::counter!("token_pool_rate_limited_total", "family" => family.to_string())
                            .increment(1);
                    }
                    return Err(e);
                }
            }
        }
    }

    /// One selection pass. Never blocks.
    fn try_acquire(&self, family: &str, pinned: Option<usize>) -> Result<Lease> {
        let now = Instant::now();
        let limit = self.config.families.get(family).copied();
        let mut guard = self.lock();
        let TrackerState {
            pool,
            windows,
            next_index,
        } = &mut *guard;

        pool.finalize();
        let n = pool.len();
        if n == 0 {
            return Err(Error::PoolExhausted("credential pool is empty".into()));
        }

        let candidates: Vec<usize> = match pinned {
            Some(position) => vec![position],
            None => (0..n).map(|offset| (*next_index + offset) % n).collect(),
        };

        let mut earliest: Option<Duration> = None;
        for position in candidates {
            let entry = pool.entry(position);
            if entry.status == CredentialStatus::Disabled {
                continue;
            }
            if pinned.is_none() && entry.pinned {
                continue;
            }

            let key = (position, family.to_string());
            if !windows.contains_key(&key)
                && let Some(limit) = limit
            {
                windows.insert(key.clone(), RateWindow::fresh(limit, now));
            }
            if let Some(window) = windows.get_mut(&key)
                && !window.try_reserve(now)
            {
                let wait = window.wait_time(now);
                earliest = Some(earliest.map_or(wait, |e| e.min(wait)));
                continue;
            }

            if pinned.is_none() {
                *next_index = (position + 1) % n;
            }
            debug!(
                credential_id = %entry.id,
                family,
                remaining = windows.get(&key).map(|w| w.remaining()),
                "credential acquired"
            );
            return Ok(Lease {
                position,
                credential_id: entry.id.clone(),
                credential: entry.credential.clone(),
                family: family.to_string(),
            });
        }

        match earliest {
            Some(wait) => Err(Error::RateLimited {
                family: family.to_string(),
                wait,
            }),
            None => Err(Error::PoolExhausted(match pinned {
                Some(position) => format!(
                    "pinned credential {} is disabled",
                    pool.entry(position).id
                ),
                None => exhausted_message(pool),
            })),
        }
    }

    /// Close a lease after a successful call.
    pub fn record(&self, lease: Lease, quota: Option<&QuotaHeaders>) {
        let Some(quota) = quota else {
            return;
        };
        let mut window = RateWindow::from_quota(quota, self.period(&lease.family), Instant::now(), unix_now());
        let mut state = self.lock();
        let key = (lease.position, lease.family);
        if let Some(local) = state.windows.get(&key) {
            window.reconcile(local);
        }
        state.windows.insert(key, window);
    }

    /// Close a lease after a failed call, applying the failure to the
    /// credential's state.
    pub fn report_error(
        &self,
        lease: Lease,
        classification: ErrorClassification,
        quota: Option<&QuotaHeaders>,
    ) {
        let now = Instant::now();
        let period = self.period(&lease.family);
        let mut state = self.lock();
        match classification {
            ErrorClassification::QuotaExceeded => {
                let key = (lease.position, lease.family.clone());
                let mut window = match (quota, state.windows.get(&key)) {
                    (Some(q), _) => RateWindow::from_quota(q, period, now, unix_now()),
                    (None, Some(existing)) => existing.clone(),
                    (None, None) => match self.config.families.get(&lease.family) {
                        Some(limit) => RateWindow::fresh(*limit, now),
                        None => RateWindow::spent(period, now),
                    },
                };
                window.exhaust(now);
                info!(
                    credential_id = %lease.credential_id,
                    family = %lease.family,
                    reset_in_secs = window.wait_time(now).as_secs(),
                    "window exhausted by remote"
                );
                state.windows.insert(key, window);
            }
            ErrorClassification::Permanent => {
                warn!(credential_id = %lease.credential_id, "credential rejected by remote, disabling");
                state.pool.entry_mut(lease.position).status = CredentialStatus::Disabled;
                metrics::counter!("token_pool_disabled_total").increment(1);
            }
            ErrorClassification::Transient | ErrorClassification::Rejected => {
                if let Some(q) = quota {
                    state.windows.insert(
                        (lease.position, lease.family),
                        RateWindow::from_quota(q, period, now, unix_now()),
                    );
                }
                debug!(credential_id = %lease.credential_id, ?classification, "request failed, no pool action");
            }
        }
    }

    /// Pin the credential owned by `credential_id` for one logical call.
    ///
    /// Waits up to `pin_wait` if the same credential is already pinned
    /// elsewhere, then fails with `CredentialBusy`.
    pub async fn pin(self: &Arc<Self>, credential_id: &str) -> Result<PinGuard> {
        let (position, exclusive) = {
            let mut state = self.lock();
            state.pool.finalize();
            let position = state
                .pool
                .position(credential_id)
                .ok_or_else(|| Error::NotFound(format!("no access token for {credential_id}")))?;
            (position, state.pool.entry(position).exclusive.clone())
        };

        let exclusive = match exclusive.clone().try_lock_owned() {
            Ok(guard) => guard,
            Err(_) => {
                debug!(credential_id, wait_secs = self.config.pin_wait.as_secs(), "credential already pinned");
                tokio::time::timeout(self.config.pin_wait, exclusive.lock_owned())
                    .await
                    .map_err(|_| Error::CredentialBusy(credential_id.to_string()))?
            }
        };
        self.lock().pool.entry_mut(position).pinned = true;
        debug!(credential_id, "credential pinned");

        Ok(PinGuard {
            tracker: Arc::clone(self),
            position,
            credential_id: credential_id.to_string(),
            _exclusive: exclusive,
        })
    }

    pub fn is_pinned(&self, credential_id: &str) -> bool {
        let state = self.lock();
        state
            .pool
            .position(credential_id)
            .is_some_and(|p| state.pool.entry(p).pinned)
    }

    pub fn credential_status(&self, credential_id: &str) -> Option<CredentialStatus> {
        self.lock().pool.status(credential_id)
    }

    /// Pool snapshot for status reporting.
    ///
    /// all available → healthy, some available → degraded, none → unhealthy.
    pub fn status(&self) -> serde_json::Value {
        let now = Instant::now();
        let state = self.lock();

        let mut available = 0usize;
        let mut disabled = 0usize;
        let mut pinned = 0usize;
        let mut credentials = Vec::new();

        for (position, entry) in state.pool.entries().iter().enumerate() {
            match entry.status {
                CredentialStatus::Available => available += 1,
                CredentialStatus::Disabled => disabled += 1,
            }
            if entry.pinned {
                pinned += 1;
            }

            let mut windows: Vec<serde_json::Value> = state
                .windows
                .iter()
                .filter(|((p, _), _)| *p == position)
                .map(|((_, family), window)| {
                    let mut window = window.clone();
                    window.refresh(now);
                    serde_json::json!({
                        "family": family,
                        "limit": window.limit(),
                        "remaining": window.remaining(),
                        "reset_in_secs": window.wait_time(now).as_secs(),
                    })
                })
                .collect();
            windows.sort_by(|a, b| a["family"].as_str().cmp(&b["family"].as_str()));

            credentials.push(serde_json::json!({
                "id": entry.id,
                "status": entry.status.label(),
                "pinned": entry.pinned,
                "windows": windows,
            }));
        }

        let total = state.pool.len();
        let pool_status = if available == total && total > 0 {
            "healthy"
        } else if available > 0 {
            "degraded"
        } else {
            "unhealthy"
        };

        serde_json::json!({
            "status": pool_status,
            "credentials_total": total,
            "credentials_available": available,
            "credentials_disabled": disabled,
            "credentials_pinned": pinned,
            "credentials": credentials,
        })
    }

    fn period(&self, family: &str) -> Duration {
        self.config
            .families
            .get(family)
            .map_or(DEFAULT_PERIOD, |l| l.period)
    }

    fn lock(&self) -> MutexGuard<'_, TrackerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

fn exhausted_message(pool: &CredentialPool) -> String {
    let entries = pool.entries();
    let disabled = entries
        .iter()
        .filter(|e| e.status == CredentialStatus::Disabled)
        .count();
    let pinned = entries.iter().filter(|e| e.pinned).count();
    format!(
        "no usable credential ({} total, {disabled} disabled, {pinned} pinned)",
        entries.len()
    )
}
