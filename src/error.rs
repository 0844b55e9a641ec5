//! Error types for leaselock.
//!
//! Uses thiserror for derive macros. Expected lock outcomes (contention, a
//! release by a non-holder, a second release) are never errors: they come back
//! as `Ok(false)` from the lock manager. Only faults that make the answer
//! unknowable, such as an unreachable store, are reported through `LeaseError`.

use crate::exit_codes;
use thiserror::Error;

/// Main error type for leaselock operations.
#[derive(Error, Debug)]
pub enum LeaseError {
    /// Invalid arguments or configuration.
    #[error("{0}")]
    UserError(String),

    /// The lock store could not complete an operation.
    #[error("Store operation failed: {0}")]
    StoreError(String),

    /// A lock could not be acquired because another holder owns it.
    ///
    /// The library reports contention as `Ok(false)`; this variant exists so
    /// the CLI can map contention onto its own exit code.
    #[error("Lock is held: {0}")]
    LockHeld(String),

    /// Work executed under a lock failed.
    #[error("Guarded task failed: {0}")]
    TaskFailed(String),
}

impl LeaseError {
    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            LeaseError::UserError(_) => exit_codes::USER_ERROR,
            LeaseError::StoreError(_) => exit_codes::STORE_FAILURE,
            LeaseError::LockHeld(_) => exit_codes::LOCK_FAILURE,
            LeaseError::TaskFailed(_) => exit_codes::TASK_FAILURE,
        }
    }
}

/// Result type alias for leaselock operations.
pub type Result<T> = std::result::Result<T, LeaseError>;
