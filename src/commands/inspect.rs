//! `list` and `show`.

use super::Session;
use crate::cli::{ListArgs, ShowArgs};
use crate::error::{LeaseError, Result};
use crate::record::{LockRecord, LockStatus};
use chrono::{DateTime, Utc};
use globset::{Glob, GlobMatcher};

/// Records matching the `list` filters, in resource order.
pub(super) fn select_records(
    records: Vec<LockRecord>,
    pattern: Option<&GlobMatcher>,
    expired_only: bool,
    now: DateTime<Utc>,
) -> Vec<LockRecord> {
    records
        .into_iter()
        .filter(|r| pattern.is_none_or(|m| m.is_match(&r.resource)))
        .filter(|r| !expired_only || r.is_expired_at(now))
        .collect()
}

fn compile_pattern(pattern: &str) -> Result<GlobMatcher> {
    Glob::new(pattern.trim())
        .map(|glob| glob.compile_matcher())
        .map_err(|e| LeaseError::UserError(format!("invalid --pattern '{}': {}", pattern, e)))
}

/// One-word state of a record at `now`.
fn state_label(record: &LockRecord, now: DateTime<Utc>) -> &'static str {
    match record.status {
        LockStatus::Released => "released",
        LockStatus::Locked if record.is_expired_at(now) => "EXPIRED",
        LockStatus::Locked => "held",
    }
}

pub fn cmd_list(session: &Session, args: ListArgs) -> Result<()> {
    let matcher = args.pattern.as_deref().map(compile_pattern).transpose()?;
    let now = session.manager.now();
    let records = select_records(
        session.manager.list()?,
        matcher.as_ref(),
        args.expired,
        now,
    );

    if records.is_empty() {
        println!("No locks.");
        return Ok(());
    }

    println!("Locks ({}):", records.len());
    println!();

    for record in &records {
        println!("  {} ({}):", record.resource, state_label(record, now));
        print_record_details(record, now);
        println!();
    }

    // Summary
    let expired_count = records.iter().filter(|r| r.is_expired_at(now)).count();
    if expired_count > 0 {
        println!(
            "Note: {} lock(s) have expired. Run `leaselock sweep` to release them.",
            expired_count
        );
    }

    Ok(())
}

pub fn cmd_show(session: &Session, args: ShowArgs) -> Result<()> {
    let record = session.manager.get(&args.resource)?.ok_or_else(|| {
        LeaseError::UserError(format!("lock '{}' does not exist", args.resource))
    })?;
    let now = session.manager.now();

    println!("{} ({})", record.resource, state_label(&record, now));
    print_record_details(&record, now);
    Ok(())
}

fn print_record_details(record: &LockRecord, now: DateTime<Utc>) {
    println!("    Holder:     {}", record.holder);
    println!("    Status:     {}", record.status);
    println!(
        "    Acquired:   {}",
        record.locked_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!(
        "    Expires:    {}",
        record.expires_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
    );
    println!(
        "    Updated:    {}",
        record.updated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("    Age:        {}", record.age_string(now));
    if record.is_active_at(now) {
        println!(
            "    Remaining:  {}ms",
            record.remaining_at(now).num_milliseconds()
        );
    }
    if let Some(reason) = record.release_reason {
        println!("    Reason:     {}", reason);
    }
}
