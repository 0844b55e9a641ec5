//! Exit code constants for the leaselock CLI.
//!
//! - 0: Success
//! - 1: User error (bad args, invalid config)
//! - 2: Guarded task failure
//! - 3: Store failure
//! - 4: Lock held by another holder

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// User error: bad arguments or invalid configuration.
pub const USER_ERROR: i32 = 1;

/// The command run under a lock failed.
pub const TASK_FAILURE: i32 = 2;

/// The lock store could not be read or written.
pub const STORE_FAILURE: i32 = 3;

/// Lock acquisition or release was refused.
pub const LOCK_FAILURE: i32 = 4;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_are_distinct() {
        let codes = [SUCCESS, USER_ERROR, TASK_FAILURE, STORE_FAILURE, LOCK_FAILURE];
        for (i, &a) in codes.iter().enumerate() {
            for (j, &b) in codes.iter().enumerate() {
                if i != j {
                    assert_ne!(a, b, "Exit codes must be distinct");
                }
            }
        }
    }

    #[test]
    fn lock_failure_keeps_its_historic_value() {
        assert_eq!(LOCK_FAILURE, 4);
    }
}
