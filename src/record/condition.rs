//! Predicates for conditional deletes.

use super::model::LockRecord;
use super::types::LockStatus;
use chrono::{DateTime, Utc};

/// Which records a conditional delete may remove.
///
/// Neither condition ever matches an active lease.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteCondition {
    /// Released records last updated before the cutoff.
    Released { updated_before: DateTime<Utc> },
    /// Released records, or locked records whose lease ran out before `now`.
    Reclaimable { now: DateTime<Utc> },
}

impl DeleteCondition {
    /// Evaluate the condition against a record.
    pub fn matches(&self, record: &LockRecord) -> bool {
        match *self {
            DeleteCondition::Released { updated_before } => {
                record.status == LockStatus::Released && record.updated_at < updated_before
            }
            DeleteCondition::Reclaimable { now } => {
                record.status == LockStatus::Released || record.is_expired_at(now)
            }
        }
    }
}
