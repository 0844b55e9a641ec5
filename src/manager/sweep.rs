//! Expiry sweep and housekeeping.

use super::{LockManager, require_non_empty};
use crate::error::{LeaseError, Result};
use crate::record::{DeleteCondition, LockStatus, ReleaseReason};
use chrono::{DateTime, Utc};
use std::time::Duration;

impl LockManager {
    /// Release every lease that ran out before `now`.
    ///
    /// Each release is conditional on the exact record the query returned, so
    /// a lease that was released or re-acquired in the meantime is left alone
    /// and not counted. Safe to run concurrently from several instances.
    ///
    /// Returns the number of leases this call released.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Result<usize> {
        let expired = self
            .store
            .query_expired_before(now, LockStatus::Locked)?;
        if expired.is_empty() {
            tracing::debug!("no expired locks");
            return Ok(0);
        }

        tracing::info!(count = expired.len(), "expired locks found");
        let mut released = 0;
        for record in expired {
            let updated = record.released(ReleaseReason::TimeoutExpired, now);
            if self
                .store
                .compare_and_update(&record.resource, &record, &updated)?
            {
                tracing::info!(
                    resource = %record.resource,
                    holder = %record.holder,
                    expired_at = %record.expires_at,
                    "expired lock released"
                );
                released += 1;
            } else {
                tracing::debug!(resource = %record.resource, "expired lock changed, skipping");
            }
        }
        Ok(released)
    }

    /// [`sweep_expired`](Self::sweep_expired) at the manager clock's now.
    pub fn sweep_expired_now(&self) -> Result<usize> {
        self.sweep_expired(self.now())
    }

    /// Delete the record for `resource` if it is released or expired.
    ///
    /// An active lease is never deleted. Returns whether a record was removed.
    pub fn purge(&self, resource: &str) -> Result<bool> {
        require_non_empty(resource, "resource")?;
        let removed = self
            .store
            .conditional_delete(resource, &DeleteCondition::Reclaimable { now: self.now() })?;
        if removed > 0 {
            tracing::info!(resource, "lock record purged");
        }
        Ok(removed > 0)
    }

    /// Delete released records whose last transition is older than `older_than`.
    ///
    /// Returns the number of records removed.
    pub fn purge_released(&self, older_than: Duration) -> Result<usize> {
        let age = chrono::Duration::from_std(older_than).map_err(|e| {
            LeaseError::UserError(format!("retention period out of range: {}", e))
        })?;
        let cutoff = self
            .now()
            .checked_sub_signed(age)
            .ok_or_else(|| LeaseError::UserError("retention period out of range".to_string()))?;
        let condition = DeleteCondition::Released {
            updated_before: cutoff,
        };

        let mut removed = 0;
        for record in self.store.list()? {
            if condition.matches(&record) {
                removed += self.store.conditional_delete(&record.resource, &condition)?;
            }
        }
        if removed > 0 {
            tracing::info!(count = removed, "released lock records purged");
        }
        Ok(removed)
    }
}
