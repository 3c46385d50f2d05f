//! Per (credential, endpoint family) quota window

use std::time::Duration;

use tokio::time::Instant;
use transport::QuotaHeaders;

/// Window length used when a family has no configured period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(15 * 60);

/// Slack when deciding whether two server reports describe the same window.
/// Reset times arrive in whole unix seconds.
const RESET_TOLERANCE: Duration = Duration::from_secs(1);

/// Stand-in limit for a window created from a 429 with no quota headers: the
/// window blocks until its reset and is effectively unbounded afterwards.
const UNKNOWN_LIMIT: u32 = u32::MAX;

/// Configured quota for one endpoint family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FamilyLimit {
    pub limit: u32,
    pub period: Duration,
}

impl FamilyLimit {
    pub const fn new(limit: u32, period: Duration) -> Self {
        Self { limit, period }
    }

    /// `limit` calls per 15-minute window.
    pub const fn per_window(limit: u32) -> Self {
        Self::new(limit, DEFAULT_PERIOD)
    }
}

/// Quota state for one (credential, family) pair.
///
/// Invariant: once `remaining` hits 0 the window is ineligible until
/// `reset_at`, at which point it refills to `limit`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateWindow {
    limit: u32,
    remaining: u32,
    reset_at: Instant,
    period: Duration,
}

impl RateWindow {
    /// A full window starting now.
    pub fn fresh(limit: FamilyLimit, now: Instant) -> Self {
        Self {
            limit: limit.limit,
            remaining: limit.limit,
            reset_at: now + limit.period,
            period: limit.period,
        }
    }

    /// Window state as reported by the server. `now_unix` must be the same
    /// moment as `now`, expressed in unix seconds.
    pub fn from_quota(quota: &QuotaHeaders, period: Duration, now: Instant, now_unix: u64) -> Self {
        Self {
            limit: quota.limit,
            remaining: quota.remaining.min(quota.limit),
            reset_at: now + quota.reset_in(now_unix),
            period,
        }
    }

    /// An already-spent window with unknown limit.
    pub fn spent(period: Duration, now: Instant) -> Self {
        Self {
            limit: UNKNOWN_LIMIT,
            remaining: 0,
            reset_at: now + period,
            period,
        }
    }

    /// Refill the window if its reset time has passed.
    pub fn refresh(&mut self, now: Instant) {
        if now >= self.reset_at {
            self.remaining = self.limit;
            self.reset_at = now + self.period;
        }
    }

    /// Take one unit of quota. Returns false if the window is spent.
    pub fn try_reserve(&mut self, now: Instant) -> bool {
        self.refresh(now);
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        true
    }

    /// Mark the window spent. A reset that is not in the future would refill
    /// it on the next reserve, so it is pushed out by one period instead.
    pub fn exhaust(&mut self, now: Instant) {
        self.remaining = 0;
        if self.reset_at <= now {
            self.reset_at = now + self.period;
        }
    }

    /// Keep reservations made locally since the server built its report.
    ///
    /// Applies only when `local` describes the same window (same limit, same
    /// reset); otherwise the server's view stands as is.
    pub fn reconcile(&mut self, local: &RateWindow) {
        let same_reset = if self.reset_at >= local.reset_at {
            self.reset_at - local.reset_at <= RESET_TOLERANCE
        } else {
            local.reset_at - self.reset_at <= RESET_TOLERANCE
        };
        if self.limit == local.limit && same_reset {
            self.remaining = self.remaining.min(local.remaining);
        }
    }

    /// Time until the window refills. Positive for a spent window that has
    /// been refreshed at `now`.
    pub fn wait_time(&self, now: Instant) -> Duration {
        self.reset_at.saturating_duration_since(now)
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn reset_at(&self) -> Instant {
        self.reset_at
    }
}
