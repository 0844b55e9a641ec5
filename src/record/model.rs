//! The persisted lock record.

use super::types::{LockStatus, ReleaseReason};
use chrono::{DateTime, Duration, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One lease on one named resource.
///
/// Timestamps carry millisecond precision so that every store round-trips a
/// record exactly; compare-and-update relies on whole-record equality.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockRecord {
    /// Unique name of the protected resource.
    pub resource: String,

    /// When the lease was granted. Never changes for a given lease.
    pub locked_at: DateTime<Utc>,

    /// Last status transition.
    pub updated_at: DateTime<Utc>,

    /// End of the lease (`locked_at + lease`).
    pub expires_at: DateTime<Utc>,

    /// Current status.
    pub status: LockStatus,

    /// Identity of the current or most recent holder.
    pub holder: String,

    /// Why the lease was released. Unset while locked.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_reason: Option<ReleaseReason>,
}

/// Truncate a timestamp to the millisecond precision stored by every backend.
pub fn to_store_precision(ts: DateTime<Utc>) -> DateTime<Utc> {
    ts.trunc_subsecs(3)
}

impl LockRecord {
    /// Build a fresh lease starting at `now`.
    ///
    /// `lease_millis` must be positive; the manager substitutes its default
    /// before calling this.
    pub fn locked(resource: &str, holder: &str, now: DateTime<Utc>, lease_millis: i64) -> Self {
        debug_assert!(lease_millis > 0, "lease duration must be positive");
        let locked_at = to_store_precision(now);
        Self {
            resource: resource.to_string(),
            locked_at,
            updated_at: locked_at,
            expires_at: locked_at + Duration::milliseconds(lease_millis),
            status: LockStatus::Locked,
            holder: holder.to_string(),
            release_reason: None,
        }
    }

    /// Return the released form of this record.
    ///
    /// `locked_at`, `expires_at` and `holder` are kept for audit.
    pub fn released(&self, reason: ReleaseReason, now: DateTime<Utc>) -> Self {
        Self {
            updated_at: to_store_precision(now),
            status: LockStatus::Released,
            release_reason: Some(reason),
            ..self.clone()
        }
    }

    /// Locked, but the lease ran out before `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.status == LockStatus::Locked && self.expires_at < now
    }

    /// Locked and still within its lease at `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.status == LockStatus::Locked && !self.is_expired_at(now)
    }

    /// Time left on the lease, zero once expired or released.
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Duration {
        if self.is_active_at(now) {
            self.expires_at.signed_duration_since(now)
        } else {
            Duration::zero()
        }
    }

    /// Lease length as granted.
    pub fn lease_duration(&self) -> Duration {
        self.expires_at.signed_duration_since(self.locked_at)
    }

    /// Format the age of the lease as a human-readable string.
    pub fn age_string(&self, now: DateTime<Utc>) -> String {
        let age = now.signed_duration_since(self.locked_at);
        let seconds = age.num_seconds();
        let minutes = age.num_minutes();
        let hours = age.num_hours();
        let days = age.num_days();

        if days > 0 {
            format!("{}d {}h", days, hours % 24)
        } else if hours > 0 {
            format!("{}h {}m", hours, minutes % 60)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds % 60)
        } else {
            format!("{}s", seconds.max(0))
        }
    }
}

impl fmt::Display for LockRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}, holder: {}, expires: {}",
            self.resource,
            self.status,
            self.holder,
            self.expires_at.format("%Y-%m-%d %H:%M:%S%.3f UTC")
        )?;
        if let Some(reason) = self.release_reason {
            write!(f, ", reason: {}", reason)?;
        }
        write!(f, ")")
    }
}
