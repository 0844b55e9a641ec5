//! Command implementations for leaselock.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations, and the [`Session`] every command runs against: the
//! loaded config with command-line overrides applied, a lock manager over the
//! configured store, and the resolved holder identity.

mod housekeeping;
mod inspect;
mod lease;
mod run;


use crate::cli::{Command, GlobalArgs};
use crate::config::{Config, DEFAULT_CONFIG_FILE};
use crate::error::Result;
use crate::identity::resolve_holder;
use crate::manager::LockManager;

/// Everything a command needs.
pub struct Session {
    pub config: Config,
    pub manager: LockManager,
    pub holder: String,
}

impl Session {
    /// Load config and apply command-line overrides.
    pub fn open(global: &GlobalArgs) -> Result<Self> {
        let mut config = match &global.config {
            Some(path) => Config::load(path)?,
            None => Config::load_or_default(DEFAULT_CONFIG_FILE)?,
        };

        if let Some(backend) = global.store {
            // A path configured for one backend is not valid for another.
            if backend != config.store.backend {
                config.store.path = None;
            }
            config.store.backend = backend;
        }
        if let Some(path) = &global.store_path {
            config.store.path = Some(path.clone());
        }
        config.validate()?;

        let holder = resolve_holder(global.holder.as_deref(), config.holder_id.as_deref());
        let manager = config.manager()?;
        tracing::debug!(holder = %holder, backend = manager.backend_name(), "session opened");

        Ok(Self {
            config,
            manager,
            holder,
        })
    }
}

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution. Each command
/// is routed to its handler function.
pub fn dispatch(global: &GlobalArgs, command: Command) -> Result<()> {
    let session = Session::open(global)?;

    match command {
        Command::Acquire(args) => lease::cmd_acquire(&session, args),
        Command::Release(args) => lease::cmd_release(&session, args),
        Command::ForceRelease(args) => lease::cmd_force_release(&session, args),
        Command::Sweep(args) => housekeeping::cmd_sweep(&session, args),
        Command::List(args) => inspect::cmd_list(&session, args),
        Command::Show(args) => inspect::cmd_show(&session, args),
        Command::Purge(args) => housekeeping::cmd_purge(&session, args),
        Command::Run(args) => run::cmd_run(&session, args),
    }
}
