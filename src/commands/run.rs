//! `run`: execute a command under a lease.

use super::Session;
use super::lease::describe_holder;
use crate::cli::RunArgs;
use crate::error::{LeaseError, Result};
use crate::guard::{GuardError, GuardedRunner};
use std::process::Command;
use std::time::Duration;

/// Work out the argv to execute.
///
/// Uses shell-words to parse `--command` into an argv array for deterministic
/// execution without invoking a shell.
pub(super) fn command_argv(command: Option<&str>, argv: Vec<String>) -> Result<Vec<String>> {
    let args = match command {
        Some(line) => shell_words::split(line).map_err(|e| {
            LeaseError::UserError(format!(
                "failed to parse --command '{}': {}\n\n\
                 Fix: check for unmatched quotes or invalid escape sequences.",
                line, e
            ))
        })?,
        None => argv,
    };

    if args.is_empty() {
        return Err(LeaseError::UserError(
            "no command given.\n\n\
             Usage: leaselock run <resource> -- <command> [args...]\n   \
             or:  leaselock run <resource> --command \"<command line>\""
                .to_string(),
        ));
    }
    Ok(args)
}

/// Run `argv` to completion, inheriting stdio.
pub(super) fn run_child(argv: &[String]) -> Result<()> {
    let program = &argv[0];
    let status = Command::new(program)
        .args(&argv[1..])
        .status()
        .map_err(|e| {
            LeaseError::TaskFailed(format!(
                "failed to execute '{}': {}\n\n\
                 Fix: ensure the command is installed and in PATH.",
                program, e
            ))
        })?;

    if status.success() {
        return Ok(());
    }
    let code = status
        .code()
        .map(|c| c.to_string())
        .unwrap_or_else(|| "none (terminated by signal)".to_string());
    Err(LeaseError::TaskFailed(format!(
        "'{}' exited with code {}",
        shell_words::join(argv),
        code
    )))
}

pub fn cmd_run(session: &Session, args: RunArgs) -> Result<()> {
    let argv = command_argv(args.command.as_deref(), args.argv)?;
    let lease = Duration::from_millis(args.lease_ms);

    let runner = GuardedRunner::new(session.manager.clone(), session.holder.clone());
    match runner.run_propagating(&args.resource, lease, || run_child(&argv)) {
        Ok(Some(())) => Ok(()),
        Ok(None) => Err(LeaseError::LockHeld(describe_holder(session, &args.resource))),
        Err(GuardError::Work(e)) | Err(GuardError::Lease(e)) => Err(e),
    }
}
