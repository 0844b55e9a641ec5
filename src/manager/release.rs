//! Lease release, including the privileged paths.

use super::{LockManager, SYSTEM_HOLDER, require_non_empty};
use crate::error::Result;
use crate::record::{LockStatus, ReleaseReason};

/// Who is asking for a release.
#[derive(Debug, Clone, Copy)]
enum Authority<'a> {
    /// The recorded holder; checked against the record.
    Holder(&'a str),
    /// An administrator; may release any lease.
    Admin(&'a str),
    /// The expiry path; may release only leases that have run out.
    Expiry,
}

impl Authority<'_> {
    fn name(&self) -> &str {
        match *self {
            Authority::Holder(name) | Authority::Admin(name) => name,
            Authority::Expiry => SYSTEM_HOLDER,
        }
    }
}

impl LockManager {
    /// Release `resource` on behalf of `holder`.
    ///
    /// Returns `Ok(false)` without changing anything when there is no
    /// record, the record is already released, or `holder` is not the
    /// recorded holder.
    pub fn release(&self, resource: &str, holder: &str, reason: ReleaseReason) -> Result<bool> {
        require_non_empty(holder, "holder")?;
        self.release_as(resource, Authority::Holder(holder), reason)
    }

    /// Release after the protected work completed.
    pub fn release_normal(&self, resource: &str, holder: &str) -> Result<bool> {
        self.release(resource, holder, ReleaseReason::Normal)
    }

    /// Release because the holding process is shutting down.
    pub fn release_on_shutdown(&self, resource: &str, holder: &str) -> Result<bool> {
        self.release(resource, holder, ReleaseReason::SystemShutdown)
    }

    /// Release because the protected work failed.
    pub fn release_on_error(&self, resource: &str, holder: &str) -> Result<bool> {
        self.release(resource, holder, ReleaseReason::ErrorDuringProcess)
    }

    /// Release `resource` regardless of who holds it.
    ///
    /// Recorded with reason `FORCED_BY_ADMIN`; the administrator identity is
    /// logged, the previous holder stays on the record.
    pub fn force_release(&self, resource: &str, admin: &str) -> Result<bool> {
        require_non_empty(admin, "admin")?;
        self.release_as(resource, Authority::Admin(admin), ReleaseReason::ForcedByAdmin)
    }

    /// Release `resource` if its lease has run out, regardless of holder.
    pub fn release_expired(&self, resource: &str) -> Result<bool> {
        self.release_as(resource, Authority::Expiry, ReleaseReason::TimeoutExpired)
    }

    fn release_as(
        &self,
        resource: &str,
        authority: Authority<'_>,
        reason: ReleaseReason,
    ) -> Result<bool> {
        require_non_empty(resource, "resource")?;
        let now = self.now();

        let Some(current) = self.store.get(resource)? else {
            tracing::warn!(resource, by = authority.name(), "release of unknown lock");
            return Ok(false);
        };

        if current.status == LockStatus::Released {
            tracing::warn!(
                resource,
                by = authority.name(),
                holder = %current.holder,
                "lock already released"
            );
            return Ok(false);
        }

        match authority {
            Authority::Holder(holder) if current.holder != holder => {
                tracing::warn!(
                    resource,
                    requested_by = holder,
                    holder = %current.holder,
                    "release refused: not the holder"
                );
                return Ok(false);
            }
            Authority::Holder(_) => {}
            Authority::Admin(admin) => {
                tracing::warn!(
                    resource,
                    admin,
                    holder = %current.holder,
                    "forcing lock release"
                );
            }
            Authority::Expiry if !current.is_expired_at(now) => {
                tracing::debug!(resource, expires_at = %current.expires_at, "lease not expired");
                return Ok(false);
            }
            Authority::Expiry => {}
        }

        let released = current.released(reason, now);
        if !self.store.compare_and_update(resource, &current, &released)? {
            tracing::debug!(resource, "lock changed during release");
            return Ok(false);
        }

        tracing::info!(
            resource,
            by = authority.name(),
            holder = %current.holder,
            reason = %reason,
            "lock released"
        );
        Ok(true)
    }
}
