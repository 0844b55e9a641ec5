//! `sweep` and `purge`.

use super::Session;
use crate::cli::{PurgeArgs, SweepArgs};
use crate::error::{LeaseError, Result};
use crate::sweeper::Sweeper;
use std::time::Duration;

pub fn cmd_sweep(session: &Session, args: SweepArgs) -> Result<()> {
    if !args.watch {
        let released = session.manager.sweep_expired_now()?;
        if released == 0 {
            println!("No expired locks.");
        } else {
            println!("Released {} expired lock(s).", released);
        }
        return Ok(());
    }

    let interval = match args.interval_secs {
        Some(0) => {
            return Err(LeaseError::UserError(
                "--interval-secs must be greater than 0".to_string(),
            ));
        }
        Some(secs) => Duration::from_secs(secs),
        None => session.config.sweep_interval(),
    };

    eprintln!("Sweeping expired locks every {}s (Ctrl-C to stop).", interval.as_secs());
    eprintln!("  store:  {}", session.manager.backend_name());

    Sweeper::spawn(session.manager.clone(), interval)?.join();
    Ok(())
}

pub fn cmd_purge(session: &Session, args: PurgeArgs) -> Result<()> {
    if let Some(resource) = args.resource {
        if !session.manager.purge(&resource)? {
            return Err(LeaseError::UserError(format!(
                "lock '{}' does not exist or is still held.\n\n\
                 Active leases are never purged; release or force-release it first.",
                resource
            )));
        }
        println!("Purged lock record '{}'.", resource);
        return Ok(());
    }

    let retention = args
        .older_than_secs
        .map(Duration::from_secs)
        .unwrap_or_else(|| session.config.retain_released());
    let removed = session.manager.purge_released(retention)?;
    println!(
        "Purged {} released lock record(s) older than {}s.",
        removed,
        retention.as_secs()
    );
    Ok(())
}
