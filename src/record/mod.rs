//! Lock records.
//!
//! A lock record is the persisted state of one lease on one named resource.
//! At most one record exists per resource name; the store enforces that.
//!
//! # Lifecycle
//!
//! - created `LOCKED` by a successful acquire
//! - rewritten `RELEASED` (with a [`ReleaseReason`]) by a release or a sweep
//! - replaced by a brand-new lease when a later acquire reuses the row
//! - optionally deleted by a purge once it is no longer active
//!
//! Expiry is never stored. A record is expired when it is `LOCKED` and its
//! `expires_at` lies in the past; callers evaluate that against a clock.

mod condition;
mod model;
mod types;


pub use condition::DeleteCondition;
pub use model::{LockRecord, to_store_precision};
pub use types::{LockStatus, ReleaseReason};
