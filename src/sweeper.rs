//! Background expiry sweeps.
//!
//! The lock manager only exposes a one-shot sweep; how often it runs is up to
//! the host. [`Sweeper`] is the simple answer: a thread that sweeps on a fixed
//! interval until stopped.

use crate::error::{LeaseError, Result};
use crate::manager::LockManager;
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Interval between sweeps when none is configured (15 minutes).
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(900);

/// Periodic sweep runner.
pub struct Sweeper;

impl Sweeper {
    /// Start sweeping every `interval` on a background thread.
    ///
    /// The first sweep runs immediately. Sweep errors are logged and the loop
    /// keeps going.
    pub fn spawn(manager: LockManager, interval: Duration) -> Result<SweeperHandle> {
        if interval.is_zero() {
            return Err(LeaseError::UserError(
                "sweep interval must be greater than zero".to_string(),
            ));
        }

        let (stop_tx, stop_rx) = mpsc::channel::<()>();
        let thread = thread::Builder::new()
            .name("leaselock-sweeper".to_string())
            .spawn(move || {
                tracing::info!(interval_secs = interval.as_secs_f64(), "sweeper started");
                loop {
                    match manager.sweep_expired_now() {
                        Ok(0) => {}
                        Ok(count) => tracing::info!(count, "sweep released expired locks"),
                        Err(e) => tracing::error!(error = %e, "sweep failed"),
                    }

                    match stop_rx.recv_timeout(interval) {
                        Err(RecvTimeoutError::Timeout) => continue,
                        Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                    }
                }
                tracing::info!("sweeper stopped");
            })
            .map_err(|e| LeaseError::UserError(format!("failed to start sweeper: {}", e)))?;

        Ok(SweeperHandle {
            stop: Some(stop_tx),
            thread: Some(thread),
        })
    }
}

/// Handle to a running [`Sweeper`]. Dropping it stops the thread.
pub struct SweeperHandle {
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl SweeperHandle {
    /// Stop the sweeper and wait for its thread to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    /// Block until the sweeper thread exits.
    ///
    /// The thread only exits after [`stop`](Self::stop) or a drop, so this is
    /// for hosts that sweep until the process is killed.
    pub fn join(mut self) {
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("sweeper thread panicked");
        }
    }

    fn shutdown(&mut self) {
        if let Some(stop) = self.stop.take() {
            // The receiver is gone only if the thread already exited.
            let _ = stop.send(());
        }
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::warn!("sweeper thread panicked");
        }
    }
}

impl Drop for SweeperHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
