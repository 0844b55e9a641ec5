//! `acquire`, `release` and `force-release`.

use super::Session;
use crate::cli::{AcquireArgs, ForceReleaseArgs, ReleaseArgs};
use crate::error::{LeaseError, Result};
use crate::record::{LockRecord, LockStatus};

/// Convert a CLI lease length into the manager's signed milliseconds.
fn lease_ms_arg(lease_ms: u64) -> i64 {
    i64::try_from(lease_ms).unwrap_or(i64::MAX)
}

/// Describe who holds `resource`, for contention messages.
pub(super) fn describe_holder(session: &Session, resource: &str) -> String {
    match session.manager.get(resource) {
        Ok(Some(record)) => {
            let now = session.manager.now();
            format!(
                "'{}' is held by {} (acquired {} ago, expires {})",
                resource,
                record.holder,
                record.age_string(now),
                record.expires_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
            )
        }
        _ => format!("'{}' is held by another holder", resource),
    }
}

pub fn cmd_acquire(session: &Session, args: AcquireArgs) -> Result<()> {
    let lease_ms = lease_ms_arg(args.lease_ms);

    if !session
        .manager
        .acquire(&args.resource, &session.holder, lease_ms)?
    {
        return Err(LeaseError::LockHeld(describe_holder(session, &args.resource)));
    }

    let record = session.manager.get(&args.resource)?;
    println!("Acquired lock on '{}'.", args.resource);
    if let Some(record) = record {
        print_lease(&record);
    }
    Ok(())
}

pub fn cmd_release(session: &Session, args: ReleaseArgs) -> Result<()> {
    if args.reason.is_privileged() {
        return Err(LeaseError::UserError(format!(
            "reason {} is reserved.\n\n\
             Use `leaselock force-release {} --admin <id>` or `leaselock sweep` instead.",
            args.reason, args.resource
        )));
    }

    if !session
        .manager
        .release(&args.resource, &session.holder, args.reason)?
    {
        return Err(LeaseError::LockHeld(release_refusal(
            session,
            &args.resource,
        )));
    }

    println!("Released lock on '{}' ({}).", args.resource, args.reason);
    Ok(())
}

pub fn cmd_force_release(session: &Session, args: ForceReleaseArgs) -> Result<()> {
    let previous = session.manager.get(&args.resource)?;

    if !session.manager.force_release(&args.resource, &args.admin)? {
        return Err(LeaseError::UserError(format!(
            "lock '{}' does not exist or is already released",
            args.resource
        )));
    }

    println!("Force-released lock on '{}'.", args.resource);
    if let Some(previous) = previous {
        println!("  Previous holder: {}", previous.holder);
        println!(
            "  Acquired:        {}",
            previous.locked_at.format("%Y-%m-%d %H:%M:%S UTC")
        );
    }
    println!("  Released by:     {}", args.admin);
    Ok(())
}

/// Explain why a holder release was refused.
fn release_refusal(session: &Session, resource: &str) -> String {
    match session.manager.get(resource) {
        Ok(None) => format!("lock '{}' does not exist", resource),
        Ok(Some(record)) if record.status == LockStatus::Released => {
            format!("lock '{}' is already released", resource)
        }
        Ok(Some(record)) => format!(
            "lock '{}' is held by {}, not {}",
            resource, record.holder, session.holder
        ),
        Err(_) => format!("lock '{}' was not released", resource),
    }
}

fn print_lease(record: &LockRecord) {
    println!("  Holder:   {}", record.holder);
    println!(
        "  Acquired: {}",
        record.locked_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
    );
    println!(
        "  Expires:  {}",
        record.expires_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
    );
}
