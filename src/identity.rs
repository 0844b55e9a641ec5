//! Holder identity resolution.
//!
//! The lock manager treats holder identity as an opaque string supplied by the
//! caller. This module picks that string for the CLI and for hosts that do not
//! want to choose one themselves, in this order:
//!
//! 1. an explicit value (e.g. `--holder`)
//! 2. `holder_id` from the configuration file
//! 3. the `LEASELOCK_HOLDER` environment variable
//! 4. the `LOCKER_ID` environment variable
//! 5. `user@HOST`
//!
//! Blank values are skipped at every step.

/// Environment variable naming the holder.
pub const HOLDER_ENV: &str = "LEASELOCK_HOLDER";

/// Fallback environment variable naming the holder.
pub const LEGACY_HOLDER_ENV: &str = "LOCKER_ID";

/// Used when no user or host name can be determined.
pub const DEFAULT_HOLDER: &str = "default-locker";

/// Pick the holder identity for this process.
pub fn resolve_holder(explicit: Option<&str>, configured: Option<&str>) -> String {
    explicit
        .and_then(non_blank)
        .or_else(|| configured.and_then(non_blank))
        .map(str::to_string)
        .or_else(|| env_non_blank(HOLDER_ENV))
        .or_else(|| env_non_blank(LEGACY_HOLDER_ENV))
        .unwrap_or_else(owner_string)
}

/// `user@HOST` for this process, or [`DEFAULT_HOLDER`] when neither part is known.
pub fn owner_string() -> String {
    let user = env_non_blank("USER").or_else(|| env_non_blank("USERNAME"));
    let host = hostname::get()
        .ok()
        .map(|h| h.to_string_lossy().trim().to_string())
        .filter(|h| !h.is_empty());

    match (user, host) {
        (None, None) => DEFAULT_HOLDER.to_string(),
        (user, host) => format!(
            "{}@{}",
            user.as_deref().unwrap_or("unknown"),
            host.as_deref().unwrap_or("unknown")
        ),
    }
}

fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

fn env_non_blank(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .and_then(|v| non_blank(&v).map(str::to_string))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    /// Set or clear an environment variable for the duration of a test.
    struct EnvGuard {
        name: &'static str,
        previous: Option<String>,
    }

    impl EnvGuard {
        fn set(name: &'static str, value: Option<&str>) -> Self {
            let previous = std::env::var(name).ok();
            // SAFETY: tests touching the environment are #[serial].
            unsafe {
                match value {
                    Some(v) => std::env::set_var(name, v),
                    None => std::env::remove_var(name),
                }
            }
            Self { name, previous }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            // SAFETY: see EnvGuard::set.
            unsafe {
                match &self.previous {
                    Some(v) => std::env::set_var(self.name, v),
                    None => std::env::remove_var(self.name),
                }
            }
        }
    }

    #[test]
    #[serial]
    fn explicit_value_wins() {
        let _a = EnvGuard::set(HOLDER_ENV, Some("from-env"));
        assert_eq!(resolve_holder(Some("cli"), Some("config")), "cli");
    }

    #[test]
    #[serial]
    fn configured_value_beats_environment() {
        let _a = EnvGuard::set(HOLDER_ENV, Some("from-env"));
        assert_eq!(resolve_holder(None, Some("config")), "config");
        assert_eq!(resolve_holder(Some("  "), Some(" config ")), "config");
    }

    #[test]
    #[serial]
    fn environment_order() {
        let _a = EnvGuard::set(HOLDER_ENV, Some("primary"));
        let _b = EnvGuard::set(LEGACY_HOLDER_ENV, Some("legacy"));
        assert_eq!(resolve_holder(None, None), "primary");

        let _c = EnvGuard::set(HOLDER_ENV, Some(""));
        assert_eq!(resolve_holder(None, None), "legacy");
    }

    #[test]
    #[serial]
    fn falls_back_to_owner_string() {
        let _a = EnvGuard::set(HOLDER_ENV, None);
        let _b = EnvGuard::set(LEGACY_HOLDER_ENV, None);
        let holder = resolve_holder(None, Some(""));
        assert_eq!(holder, owner_string());
        assert!(!holder.is_empty());
    }

    #[test]
    #[serial]
    fn owner_string_has_user_and_host() {
        let _a = EnvGuard::set("USER", Some("alice"));
        let owner = owner_string();
        assert!(owner.starts_with("alice@"), "unexpected owner: {}", owner);
    }
}
