//! Filesystem utilities backing the file lock store.
//!
//! Atomic writes keep every lock document whole on disk; the directory lock
//! turns each read-compare-write into one indivisible step across processes.

pub mod atomic;
mod store_lock;

pub use atomic::{atomic_write, atomic_write_file};
pub use store_lock::DirLock;
