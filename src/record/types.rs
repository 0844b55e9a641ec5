//! Lock status and release reason enumerations.

use crate::error::LeaseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Persisted status of a lock record.
///
/// `Locked` says nothing about expiry: a locked record whose `expires_at` has
/// passed is still `Locked` until a release or a sweep rewrites it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LockStatus {
    /// The lease is held (possibly expired but not yet swept).
    Locked,
    /// The lease was explicitly given up or reclaimed.
    Released,
}

impl LockStatus {
    /// Stable string form used by stores and the CLI.
    pub const fn as_str(&self) -> &'static str {
        match self {
            LockStatus::Locked => "LOCKED",
            LockStatus::Released => "RELEASED",
        }
    }
}

impl fmt::Display for LockStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LockStatus {
    type Err = LeaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LOCKED" => Ok(LockStatus::Locked),
            "RELEASED" => Ok(LockStatus::Released),
            _ => Err(LeaseError::UserError(format!("invalid lock status: '{}'", s))),
        }
    }
}

/// Why a lease was released.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReleaseReason {
    /// The holder finished its work.
    Normal,
    /// The lease ran past `expires_at` and was reclaimed.
    TimeoutExpired,
    /// An administrator released someone else's lease.
    ForcedByAdmin,
    /// The holder released during shutdown.
    SystemShutdown,
    /// The holder released after its work failed.
    ErrorDuringProcess,
}

impl ReleaseReason {
    /// All reasons, in declaration order.
    pub const ALL: [ReleaseReason; 5] = [
        ReleaseReason::Normal,
        ReleaseReason::TimeoutExpired,
        ReleaseReason::ForcedByAdmin,
        ReleaseReason::SystemShutdown,
        ReleaseReason::ErrorDuringProcess,
    ];

    /// Stable string form used by stores and the CLI.
    pub const fn as_str(&self) -> &'static str {
        match self {
            ReleaseReason::Normal => "NORMAL",
            ReleaseReason::TimeoutExpired => "TIMEOUT_EXPIRED",
            ReleaseReason::ForcedByAdmin => "FORCED_BY_ADMIN",
            ReleaseReason::SystemShutdown => "SYSTEM_SHUTDOWN",
            ReleaseReason::ErrorDuringProcess => "ERROR_DURING_PROCESS",
        }
    }

    /// Whether this reason is only reachable through a privileged path
    /// (expiry reclaim or admin force) that skips the holder check.
    pub const fn is_privileged(&self) -> bool {
        matches!(
            self,
            ReleaseReason::TimeoutExpired | ReleaseReason::ForcedByAdmin
        )
    }
}

impl fmt::Display for ReleaseReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReleaseReason {
    type Err = LeaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_uppercase().replace('-', "_");
        ReleaseReason::ALL
            .into_iter()
            .find(|reason| reason.as_str() == normalized)
            .ok_or_else(|| {
                LeaseError::UserError(format!(
                    "invalid release reason: '{}' (expected one of: {})",
                    s,
                    ReleaseReason::ALL
                        .iter()
                        .map(|r| r.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                ))
            })
    }
}
