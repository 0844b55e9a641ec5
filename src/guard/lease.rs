//! RAII lease guard.

use crate::error::Result;
use crate::manager::LockManager;
use crate::record::ReleaseReason;

/// A held lease.
///
/// When dropped, the lease is released with reason `NORMAL`. If that release
/// fails, a warning is logged but no panic occurs.
#[must_use = "the lease is released as soon as the guard is dropped"]
pub struct LeaseGuard {
    manager: LockManager,
    resource: String,
    holder: String,

    /// Whether the lease has been released explicitly.
    released: bool,
}

impl LeaseGuard {
    pub(crate) fn new(manager: LockManager, resource: &str, holder: &str) -> Self {
        Self {
            manager,
            resource: resource.to_string(),
            holder: holder.to_string(),
            released: false,
        }
    }

    /// The leased resource.
    pub fn resource(&self) -> &str {
        &self.resource
    }

    /// The holder the lease was taken for.
    pub fn holder(&self) -> &str {
        &self.holder
    }

    /// Release now with reason `NORMAL`, reporting the outcome.
    ///
    /// `Ok(false)` means the lease was no longer ours (it expired and was
    /// swept, or force-released).
    pub fn release(self) -> Result<bool> {
        self.release_with(ReleaseReason::Normal)
    }

    /// Release now with the given reason.
    pub fn release_with(mut self, reason: ReleaseReason) -> Result<bool> {
        self.released = true;
        self.manager.release(&self.resource, &self.holder, reason)
    }
}

impl std::fmt::Debug for LeaseGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeaseGuard")
            .field("resource", &self.resource)
            .field("holder", &self.holder)
            .field("released", &self.released)
            .finish()
    }
}

impl Drop for LeaseGuard {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        match self
            .manager
            .release(&self.resource, &self.holder, ReleaseReason::Normal)
        {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(
                    resource = %self.resource,
                    holder = %self.holder,
                    "lease was no longer held when the guard dropped"
                );
            }
            Err(e) => {
                tracing::warn!(
                    resource = %self.resource,
                    error = %e,
                    "failed to release lease on drop"
                );
            }
        }
    }
}
