//! Run a unit of work under a lease.

use crate::error::{LeaseError, Result};
use crate::manager::{LockManager, lease_millis};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Failure of a guarded run.
#[derive(Debug, Error)]
pub enum GuardError<E> {
    /// The store failed while acquiring or releasing.
    #[error(transparent)]
    Lease(#[from] LeaseError),

    /// The protected work failed. The lease was released first.
    #[error("guarded work failed: {0}")]
    Work(E),
}

/// Runs closures under a lease for one holder.
///
/// The holder identity is fixed at construction, see
/// [`resolve_holder`](crate::identity::resolve_holder).
#[derive(Clone)]
pub struct GuardedRunner {
    manager: LockManager,
    holder: String,
}

impl GuardedRunner {
    pub fn new(manager: LockManager, holder: impl Into<String>) -> Self {
        Self {
            manager,
            holder: holder.into(),
        }
    }

    pub fn holder(&self) -> &str {
        &self.holder
    }

    pub fn manager(&self) -> &LockManager {
        &self.manager
    }

    /// Run `work` if the lease on `resource` can be taken.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - the work ran and succeeded
    /// * `Ok(false)` - the lease was not obtained, or the work failed (the
    ///   failure is logged)
    /// * `Err(_)` - the store failed
    pub fn run<E, F>(&self, resource: &str, lease: Duration, work: F) -> Result<bool>
    where
        E: fmt::Display,
        F: FnOnce() -> std::result::Result<(), E>,
    {
        match self.run_propagating(resource, lease, work) {
            Ok(executed) => Ok(executed.is_some()),
            Err(GuardError::Work(e)) => {
                tracing::error!(resource, error = %e, "guarded work failed");
                Ok(false)
            }
            Err(GuardError::Lease(e)) => Err(e),
        }
    }

    /// Run `work` if the lease on `resource` can be taken, handing back its
    /// result.
    ///
    /// `Ok(None)` means the lease was not obtained and `work` did not run.
    /// When `work` fails its error is returned as [`GuardError::Work`] after
    /// the lease has been released.
    pub fn run_propagating<T, E, F>(
        &self,
        resource: &str,
        lease: Duration,
        work: F,
    ) -> std::result::Result<Option<T>, GuardError<E>>
    where
        F: FnOnce() -> std::result::Result<T, E>,
    {
        let Some(guard) = self
            .manager
            .acquire_guard(resource, &self.holder, lease_millis(lease))?
        else {
            tracing::warn!(resource, holder = %self.holder, "lock not acquired, work skipped");
            return Ok(None);
        };

        tracing::info!(resource, holder = %self.holder, "running guarded work");
        let outcome = work();

        match (outcome, guard.release()) {
            (Ok(value), Ok(still_held)) => {
                if !still_held {
                    tracing::warn!(resource, "lease was reclaimed before the work finished");
                }
                Ok(Some(value))
            }
            (Ok(_), Err(e)) => Err(GuardError::Lease(e)),
            (Err(work_error), Ok(_)) => Err(GuardError::Work(work_error)),
            (Err(work_error), Err(e)) => {
                tracing::warn!(resource, error = %e, "release after failed work also failed");
                Err(GuardError::Work(work_error))
            }
        }
    }
}
