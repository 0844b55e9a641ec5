//! Lease lock manager.
//!
//! [`LockManager`] implements the lock protocol on top of a [`LockStore`]:
//!
//! - `acquire`: take a lease if the resource is free, released, or its lease
//!   ran out. Never waits.
//! - `release`: give a lease back. Only the recorded holder may do this.
//! - `force_release` / `release_expired` / `sweep_expired`: the two
//!   privileged paths (administrator and expiry) that skip the holder check.
//!
//! # Outcomes
//!
//! Contention, ownership mismatch and "already released" are ordinary
//! outcomes and come back as `Ok(false)`. Only store faults are `Err`.
//!
//! # State
//!
//! The manager holds no lock state. Every decision re-reads the store and
//! every write is conditional on what was read, so any number of managers
//! (threads or processes) can share one store.

mod acquire;
mod clock;
mod release;
mod sweep;


pub use clock::{Clock, SystemClock};

#[cfg(test)]
pub(crate) use clock::ManualClock;

use crate::error::{LeaseError, Result};
use crate::record::LockRecord;
use crate::store::LockStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;

/// Lease length used when a caller asks for a non-positive one.
pub const DEFAULT_LEASE: Duration = Duration::from_millis(2000);

/// Longest lease ever stored (one year); longer requests are capped.
pub const MAX_LEASE_MILLIS: i64 = 365 * 24 * 60 * 60 * 1000;

/// Holder name recorded in logs for expiry releases.
pub const SYSTEM_HOLDER: &str = "SYSTEM";

/// Coordinates leases over a shared store.
///
/// Cloning is cheap; clones share the store and clock.
#[derive(Clone)]
pub struct LockManager {
    store: Arc<dyn LockStore>,
    default_lease_ms: i64,
    clock: Arc<dyn Clock>,
}

impl LockManager {
    /// Create a manager with the default lease and the system clock.
    pub fn new(store: Arc<dyn LockStore>) -> Self {
        Self {
            store,
            default_lease_ms: DEFAULT_LEASE.as_millis() as i64,
            clock: Arc::new(SystemClock),
        }
    }

    /// Use `lease` whenever a caller asks for a non-positive lease.
    ///
    /// Sub-millisecond values are rounded up to one millisecond.
    pub fn with_default_lease(mut self, lease: Duration) -> Self {
        self.default_lease_ms = lease_millis(lease).clamp(1, MAX_LEASE_MILLIS);
        self
    }

    /// Replace the time source.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The lease applied to non-positive requests.
    pub fn default_lease(&self) -> Duration {
        Duration::from_millis(self.default_lease_ms as u64)
    }

    /// Current time according to the manager's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Name of the backing store.
    pub fn backend_name(&self) -> &'static str {
        self.store.backend_name()
    }

    /// Current record for `resource`, in any state.
    pub fn get(&self, resource: &str) -> Result<Option<LockRecord>> {
        require_non_empty(resource, "resource")?;
        self.store.get(resource)
    }

    /// Whether `resource` is held by an unexpired lease right now.
    pub fn is_locked(&self, resource: &str) -> Result<bool> {
        let now = self.now();
        Ok(self
            .get(resource)?
            .is_some_and(|record| record.is_active_at(now)))
    }

    /// Every record in the store, ordered by resource.
    pub fn list(&self) -> Result<Vec<LockRecord>> {
        self.store.list()
    }

    /// Non-positive requests take the default; longer than one year is capped.
    fn resolve_lease(&self, requested_ms: i64) -> i64 {
        if requested_ms <= 0 {
            return self.default_lease_ms;
        }
        if requested_ms > MAX_LEASE_MILLIS {
            tracing::debug!(
                requested_ms,
                max_ms = MAX_LEASE_MILLIS,
                "capping lease at the maximum"
            );
            return MAX_LEASE_MILLIS;
        }
        requested_ms
    }
}

/// Convert a `std` duration to whole milliseconds, saturating.
///
/// A non-zero duration shorter than a millisecond becomes one millisecond, so
/// only `Duration::ZERO` selects the default lease.
pub(crate) fn lease_millis(lease: Duration) -> i64 {
    let millis = i64::try_from(lease.as_millis()).unwrap_or(i64::MAX);
    if lease.is_zero() { 0 } else { millis.max(1) }
}

fn require_non_empty(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(LeaseError::UserError(format!("{} must not be empty", what)));
    }
    Ok(())
}
