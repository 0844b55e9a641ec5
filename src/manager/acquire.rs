//! Lease acquisition.

use super::{LockManager, require_non_empty};
use crate::error::Result;
use crate::guard::LeaseGuard;
use crate::record::LockRecord;

impl LockManager {
    /// Try to take a lease on `resource` for `holder`.
    ///
    /// `lease_ms <= 0` uses the manager's default lease.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - the new lease is stored
    /// * `Ok(false)` - an unexpired lease exists (including one held by
    ///   `holder` itself), or another instance won the race
    /// * `Err(LeaseError::StoreError)` - the store could not answer
    pub fn acquire(&self, resource: &str, holder: &str, lease_ms: i64) -> Result<bool> {
        require_non_empty(resource, "resource")?;
        require_non_empty(holder, "holder")?;
        let lease_ms = self.resolve_lease(lease_ms);

        let now = self.now();
        let fresh = LockRecord::locked(resource, holder, now, lease_ms);

        let won = match self.store.get(resource)? {
            None => self.store.insert_if_absent(&fresh)?,
            Some(current) if current.is_active_at(now) => {
                tracing::warn!(
                    resource,
                    holder,
                    current_holder = %current.holder,
                    expires_at = %current.expires_at,
                    "lock already held"
                );
                return Ok(false);
            }
            Some(current) => {
                tracing::info!(
                    resource,
                    previous_status = %current.status,
                    previous_holder = %current.holder,
                    "reusing released or expired lock"
                );
                self.store.compare_and_update(resource, &current, &fresh)?
            }
        };

        if won {
            tracing::info!(
                resource,
                holder,
                lease_ms,
                backend = self.store.backend_name(),
                "lock acquired"
            );
        } else {
            tracing::debug!(resource, holder, "lost acquisition race");
        }
        Ok(won)
    }

    /// Like [`acquire`](Self::acquire), but hand back a guard that releases
    /// the lease when dropped.
    ///
    /// `Ok(None)` means the lease was not obtained.
    pub fn acquire_guard(
        &self,
        resource: &str,
        holder: &str,
        lease_ms: i64,
    ) -> Result<Option<LeaseGuard>> {
        if self.acquire(resource, holder, lease_ms)? {
            Ok(Some(LeaseGuard::new(self.clone(), resource, holder)))
        } else {
            Ok(None)
        }
    }
}
