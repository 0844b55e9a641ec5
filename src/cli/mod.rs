//! CLI argument parsing for leaselock.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use crate::config::StoreBackend;
use crate::record::ReleaseReason;
use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;

/// Leaselock: lease-based locks over a shared store.
///
/// Many processes can coordinate "only one of us works on this resource now":
/// - A lease is taken on a named resource for a fixed duration
/// - Only the holder may release it; an administrator may force it
/// - Leases that run out are reclaimable and are cleared by a sweep
#[derive(Parser, Debug)]
#[command(name = "leaselock")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    #[command(subcommand)]
    pub command: Command,
}

/// Options accepted by every command.
#[derive(Args, Debug, Default)]
pub struct GlobalArgs {
    /// Config file (default: ./leaselock.yaml if present).
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Store backend: memory, file or sqlite.
    #[arg(long, global = true, value_name = "BACKEND")]
    pub store: Option<StoreBackend>,

    /// Database file (sqlite) or directory (file).
    #[arg(long, global = true, value_name = "PATH")]
    pub store_path: Option<PathBuf>,

    /// Holder identity (default: config, $LEASELOCK_HOLDER, $LOCKER_ID, user@host).
    #[arg(long, global = true, value_name = "ID")]
    pub holder: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,
}

/// Available commands for leaselock.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Take a lease on a resource.
    ///
    /// Fails with exit code 4 if another unexpired lease exists.
    Acquire(AcquireArgs),

    /// Release a lease held by this holder.
    Release(ReleaseArgs),

    /// Release a lease regardless of holder.
    ///
    /// Only use this if the holder is known to be gone.
    ForceRelease(ForceReleaseArgs),

    /// Release every lease that has run out.
    Sweep(SweepArgs),

    /// List lock records.
    List(ListArgs),

    /// Show one lock record.
    Show(ShowArgs),

    /// Delete lock records that are no longer active.
    ///
    /// With a resource, deletes that record if it is released or expired.
    /// Without one, deletes released records past the retention period.
    Purge(PurgeArgs),

    /// Run a command while holding a lease.
    ///
    /// The lease is released when the command exits, whatever its status.
    Run(RunArgs),
}

/// Arguments for the `acquire` command.
#[derive(Parser, Debug)]
pub struct AcquireArgs {
    /// Resource name.
    pub resource: String,

    /// Lease length in milliseconds (0 uses the configured default).
    #[arg(long, default_value_t = 0)]
    pub lease_ms: u64,
}

/// Arguments for the `release` command.
#[derive(Parser, Debug)]
pub struct ReleaseArgs {
    /// Resource name.
    pub resource: String,

    /// Release reason: normal, system_shutdown or error_during_process.
    #[arg(long, default_value_t = ReleaseReason::Normal)]
    pub reason: ReleaseReason,
}

/// Arguments for the `force-release` command.
#[derive(Parser, Debug)]
pub struct ForceReleaseArgs {
    /// Resource name.
    pub resource: String,

    /// Administrator identity recorded in the log.
    #[arg(long, value_name = "ID")]
    pub admin: String,
}

/// Arguments for the `sweep` command.
#[derive(Parser, Debug)]
pub struct SweepArgs {
    /// Keep sweeping on an interval until interrupted.
    #[arg(long)]
    pub watch: bool,

    /// Seconds between sweeps with --watch (default: from config).
    #[arg(long, requires = "watch")]
    pub interval_secs: Option<u64>,
}

/// Arguments for the `list` command.
#[derive(Parser, Debug)]
pub struct ListArgs {
    /// Only resources matching this glob.
    #[arg(long)]
    pub pattern: Option<String>,

    /// Only leases that have run out but are not yet released.
    #[arg(long)]
    pub expired: bool,
}

/// Arguments for the `show` command.
#[derive(Parser, Debug)]
pub struct ShowArgs {
    /// Resource name.
    pub resource: String,
}

/// Arguments for the `purge` command.
#[derive(Parser, Debug)]
pub struct PurgeArgs {
    /// Resource to purge (released or expired only).
    pub resource: Option<String>,

    /// Retention for released records in seconds (default: from config).
    #[arg(long, conflicts_with = "resource")]
    pub older_than_secs: Option<u64>,
}

/// Arguments for the `run` command.
#[derive(Parser, Debug)]
pub struct RunArgs {
    /// Resource name.
    pub resource: String,

    /// Lease length in milliseconds (0 uses the configured default).
    #[arg(long, default_value_t = 0)]
    pub lease_ms: u64,

    /// Command line to run, parsed with shell quoting rules (no shell).
    #[arg(short, long, conflicts_with = "argv")]
    pub command: Option<String>,

    /// Command and arguments to run, after `--`.
    #[arg(last = true)]
    pub argv: Vec<String>,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Cli::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn verify_cli() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_acquire() {
        let cli = Cli::try_parse_from(["leaselock", "acquire", "job-1", "--lease-ms", "5000"])
            .unwrap();
        if let Command::Acquire(args) = cli.command {
            assert_eq!(args.resource, "job-1");
            assert_eq!(args.lease_ms, 5000);
        } else {
            panic!("Expected Acquire command");
        }
    }

    #[test]
    fn parse_acquire_default_lease() {
        let cli = Cli::try_parse_from(["leaselock", "acquire", "job-1"]).unwrap();
        if let Command::Acquire(args) = cli.command {
            assert_eq!(args.lease_ms, 0);
        } else {
            panic!("Expected Acquire command");
        }
    }

    #[test]
    fn parse_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "leaselock",
            "acquire",
            "job-1",
            "--store",
            "file",
            "--store-path",
            "/tmp/locks",
            "--holder",
            "node-a",
            "-vv",
        ])
        .unwrap();

        assert_eq!(cli.global.store, Some(StoreBackend::File));
        assert_eq!(cli.global.store_path, Some(PathBuf::from("/tmp/locks")));
        assert_eq!(cli.global.holder.as_deref(), Some("node-a"));
        assert_eq!(cli.global.verbose, 2);
    }

    #[test]
    fn parse_invalid_store_rejected() {
        let result = Cli::try_parse_from(["leaselock", "--store", "redis", "list"]);
        assert!(result.is_err());
    }

    #[test]
    fn parse_release_reason() {
        let cli =
            Cli::try_parse_from(["leaselock", "release", "job-1", "--reason", "system-shutdown"])
                .unwrap();
        if let Command::Release(args) = cli.command {
            assert_eq!(args.reason, ReleaseReason::SystemShutdown);
        } else {
            panic!("Expected Release command");
        }

        let cli = Cli::try_parse_from(["leaselock", "release", "job-1"]).unwrap();
        if let Command::Release(args) = cli.command {
            assert_eq!(args.reason, ReleaseReason::Normal);
        } else {
            panic!("Expected Release command");
        }
    }

    #[test]
    fn parse_force_release_requires_admin() {
        assert!(Cli::try_parse_from(["leaselock", "force-release", "job-1"]).is_err());

        let cli = Cli::try_parse_from(["leaselock", "force-release", "job-1", "--admin", "ops"])
            .unwrap();
        if let Command::ForceRelease(args) = cli.command {
            assert_eq!(args.resource, "job-1");
            assert_eq!(args.admin, "ops");
        } else {
            panic!("Expected ForceRelease command");
        }
    }

    #[test]
    fn parse_sweep_watch() {
        let cli =
            Cli::try_parse_from(["leaselock", "sweep", "--watch", "--interval-secs", "30"]).unwrap();
        if let Command::Sweep(args) = cli.command {
            assert!(args.watch);
            assert_eq!(args.interval_secs, Some(30));
        } else {
            panic!("Expected Sweep command");
        }

        assert!(Cli::try_parse_from(["leaselock", "sweep", "--interval-secs", "30"]).is_err());
    }

    #[test]
    fn parse_list_filters() {
        let cli = Cli::try_parse_from(["leaselock", "list", "--pattern", "billing/*", "--expired"])
            .unwrap();
        if let Command::List(args) = cli.command {
            assert_eq!(args.pattern.as_deref(), Some("billing/*"));
            assert!(args.expired);
        } else {
            panic!("Expected List command");
        }
    }

    #[test]
    fn parse_purge_variants() {
        let cli = Cli::try_parse_from(["leaselock", "purge", "job-1"]).unwrap();
        if let Command::Purge(args) = cli.command {
            assert_eq!(args.resource.as_deref(), Some("job-1"));
        } else {
            panic!("Expected Purge command");
        }

        let cli = Cli::try_parse_from(["leaselock", "purge", "--older-than-secs", "60"]).unwrap();
        if let Command::Purge(args) = cli.command {
            assert_eq!(args.resource, None);
            assert_eq!(args.older_than_secs, Some(60));
        } else {
            panic!("Expected Purge command");
        }

        assert!(
            Cli::try_parse_from(["leaselock", "purge", "job-1", "--older-than-secs", "60"])
                .is_err()
        );
    }

    #[test]
    fn parse_run_with_trailing_argv() {
        let cli = Cli::try_parse_from([
            "leaselock",
            "run",
            "nightly",
            "--lease-ms",
            "60000",
            "--",
            "backup.sh",
            "--full",
        ])
        .unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(args.resource, "nightly");
            assert_eq!(args.lease_ms, 60_000);
            assert_eq!(args.command, None);
            assert_eq!(args.argv, vec!["backup.sh", "--full"]);
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_with_command_string() {
        let cli = Cli::try_parse_from([
            "leaselock",
            "run",
            "nightly",
            "--command",
            "backup.sh --label 'weekly run'",
        ])
        .unwrap();
        if let Command::Run(args) = cli.command {
            assert_eq!(
                args.command.as_deref(),
                Some("backup.sh --label 'weekly run'")
            );
            assert!(args.argv.is_empty());
        } else {
            panic!("Expected Run command");
        }
    }

    #[test]
    fn parse_run_rejects_both_forms() {
        let result = Cli::try_parse_from([
            "leaselock", "run", "nightly", "--command", "true", "--", "false",
        ]);
        assert!(result.is_err());
    }
}
