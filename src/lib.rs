//! Leaselock: lease-based mutual exclusion over a shared store.
//!
//! Independent processes coordinate "only one of us works on this resource
//! right now" through lock records kept in a store they all reach. A lock is a
//! lease: it is granted until an explicit expiry time, after which anyone may
//! reclaim it without the holder's cooperation.
//!
//! - [`record`]: the persisted lock record and its state
//! - [`store`]: the store primitives and the memory, file and SQLite backends
//! - [`manager`]: acquire, release (including the privileged paths) and sweep
//! - [`guard`]: RAII guards and guarded execution of a unit of work
//! - [`identity`] and [`sweeper`]: holder identity and periodic sweeps
//!
//! ```no_run
//! use leaselock::manager::LockManager;
//! use leaselock::store::SqliteLockStore;
//! use std::sync::Arc;
//!
//! # fn main() -> leaselock::error::Result<()> {
//! let store = SqliteLockStore::open(".leaselock/locks.db")?;
//! let manager = LockManager::new(Arc::new(store));
//!
//! if let Some(_lease) = manager.acquire_guard("nightly-export", "worker-1", 60_000)? {
//!     // ... only one worker gets here ...
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod exit_codes;
pub mod fs;
pub mod guard;
pub mod identity;
pub mod manager;
pub mod record;
pub mod store;
pub mod sweeper;

pub use error::{LeaseError, Result};
pub use guard::{GuardError, GuardedRunner, LeaseGuard};
pub use manager::LockManager;
pub use record::{LockRecord, LockStatus, ReleaseReason};
pub use store::LockStore;
