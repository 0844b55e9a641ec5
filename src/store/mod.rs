//! Lock store adapters.
//!
//! The lock manager never keeps lock state of its own; every decision is made
//! against a [`LockStore`]. A store must offer the primitives below with the
//! stated atomicity, which is all the manager relies on for correctness:
//!
//! | primitive              | atomicity                                              |
//! |------------------------|--------------------------------------------------------|
//! | `insert_if_absent`     | create only when no record exists for the resource     |
//! | `compare_and_update`   | replace only when the stored record equals `expected`  |
//! | `conditional_delete`   | delete only when the condition holds at delete time    |
//! | `query_expired_before` | per-record consistency only                            |
//!
//! # Backends
//!
//! - [`MemoryLockStore`]: `HashMap` behind a `RwLock` (tests, single process)
//! - [`FileLockStore`]: one JSON document per resource, serialized by an
//!   advisory directory lock (multi-process on one host or a shared volume)
//! - [`SqliteLockStore`]: a `lease_locks` table (multi-process, durable)
//!
//! A store that cannot answer must return `LeaseError::StoreError`. Returning
//! `Ok(false)` for a failure would be reported to callers as contention.

mod file;
mod memory;
mod sqlite;

#[cfg(test)]
mod tests;

pub use file::FileLockStore;
pub use memory::MemoryLockStore;
pub use sqlite::SqliteLockStore;

use crate::error::Result;
use crate::record::{DeleteCondition, LockRecord, LockStatus};
use chrono::{DateTime, Utc};

/// Persistence primitives for lock records.
pub trait LockStore: Send + Sync {
    /// Read the record for `resource`, if any.
    fn get(&self, resource: &str) -> Result<Option<LockRecord>>;

    /// Create `record` only if no record exists for its resource.
    ///
    /// Returns `false` when a record already exists.
    fn insert_if_absent(&self, record: &LockRecord) -> Result<bool>;

    /// Replace the record for `resource` with `new` only if the stored record
    /// is exactly `expected`.
    ///
    /// Returns `false` when the record is missing or differs in any field.
    fn compare_and_update(
        &self,
        resource: &str,
        expected: &LockRecord,
        new: &LockRecord,
    ) -> Result<bool>;

    /// Delete the record for `resource` if it satisfies `condition`.
    ///
    /// Returns the number of records removed (0 or 1).
    fn conditional_delete(&self, resource: &str, condition: &DeleteCondition) -> Result<usize>;

    /// Records with the given status whose `expires_at` is before `cutoff`,
    /// oldest expiry first.
    fn query_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        status: LockStatus,
    ) -> Result<Vec<LockRecord>>;

    /// Every record, ordered by resource name.
    fn list(&self) -> Result<Vec<LockRecord>>;

    /// Short backend name for logs.
    fn backend_name(&self) -> &'static str;
}
