//! Guarded execution.
//!
//! Work runs only while a lease is held, and the lease is given back on every
//! exit path:
//!
//! - [`LeaseGuard`] releases on drop, which also covers a panic unwinding out
//!   of the protected work.
//! - [`GuardedRunner`] acquires, runs a closure once, releases, and reports
//!   the outcome. `run` swallows work errors into `false`; `run_propagating`
//!   hands them back after the release.
//!
//! Lease expiry does not interrupt running work. Once the lease runs out
//! another holder may take the resource even though the work is still going.

mod lease;
mod runner;


pub use lease::LeaseGuard;
pub use runner::{GuardError, GuardedRunner};
