//! SQLite-backed lock store.
//!
//! Uses a single `lease_locks` table:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS lease_locks (
//!     resource       TEXT PRIMARY KEY,
//!     locked_at      INTEGER NOT NULL,
//!     updated_at     INTEGER NOT NULL,
//!     expires_at     INTEGER NOT NULL,
//!     status         TEXT NOT NULL,
//!     holder         TEXT NOT NULL,
//!     release_reason TEXT
//! );
//! ```
//!
//! Timestamps are UNIX epoch milliseconds. The primary key gives
//! insert-if-absent; compare-and-update is a single `UPDATE` whose `WHERE`
//! clause pins every column of the expected record.

use super::LockStore;
use crate::error::{LeaseError, Result};
use crate::record::{DeleteCondition, LockRecord, LockStatus, ReleaseReason};
use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const SELECT_COLUMNS: &str =
    "resource, locked_at, updated_at, expires_at, status, holder, release_reason";

/// How long a connection waits on another process's write lock.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// SQLite lock store. One connection per store instance.
pub struct SqliteLockStore {
    conn: Mutex<Connection>,
}

impl SqliteLockStore {
    /// Open (and create if needed) a database file.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                LeaseError::StoreError(format!(
                    "failed to create database directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(path).map_err(|e| {
            LeaseError::StoreError(format!(
                "failed to open lock database '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::with_connection(conn)
    }

    /// Open a private in-memory database.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().map_err(|e| {
            LeaseError::StoreError(format!("failed to open in-memory database: {}", e))
        })?;
        Self::with_connection(conn)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.busy_timeout(DEFAULT_BUSY_TIMEOUT)
            .map_err(|e| LeaseError::StoreError(format!("failed to set busy timeout: {}", e)))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.init_schema()?;
        Ok(store)
    }

    fn init_schema(&self) -> Result<()> {
        self.conn()?
            .execute_batch(
                r"
            CREATE TABLE IF NOT EXISTS lease_locks (
                resource TEXT PRIMARY KEY,
                locked_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                expires_at INTEGER NOT NULL,
                status TEXT NOT NULL,
                holder TEXT NOT NULL,
                release_reason TEXT
            );
            CREATE INDEX IF NOT EXISTS idx_lease_locks_status_expires
                ON lease_locks(status, expires_at);
        ",
            )
            .map_err(|e| LeaseError::StoreError(format!("failed to initialize schema: {}", e)))
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| LeaseError::StoreError("sqlite connection lock poisoned".to_string()))
    }
}

/// Column values as stored, before enum and timestamp decoding.
struct RawRecord {
    resource: String,
    locked_at: i64,
    updated_at: i64,
    expires_at: i64,
    status: String,
    holder: String,
    release_reason: Option<String>,
}

impl RawRecord {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            resource: row.get(0)?,
            locked_at: row.get(1)?,
            updated_at: row.get(2)?,
            expires_at: row.get(3)?,
            status: row.get(4)?,
            holder: row.get(5)?,
            release_reason: row.get(6)?,
        })
    }

    fn into_record(self) -> Result<LockRecord> {
        let status = self.status.parse::<LockStatus>().map_err(|_| {
            LeaseError::StoreError(format!(
                "invalid status '{}' stored for '{}'",
                self.status, self.resource
            ))
        })?;
        let release_reason = self
            .release_reason
            .as_deref()
            .map(|r| {
                r.parse::<ReleaseReason>().map_err(|_| {
                    LeaseError::StoreError(format!(
                        "invalid release reason '{}' stored for '{}'",
                        r, self.resource
                    ))
                })
            })
            .transpose()?;

        Ok(LockRecord {
            locked_at: from_millis(self.locked_at, &self.resource)?,
            updated_at: from_millis(self.updated_at, &self.resource)?,
            expires_at: from_millis(self.expires_at, &self.resource)?,
            status,
            holder: self.holder,
            release_reason,
            resource: self.resource,
        })
    }
}

fn from_millis(millis: i64, resource: &str) -> Result<DateTime<Utc>> {
    DateTime::<Utc>::from_timestamp_millis(millis).ok_or_else(|| {
        LeaseError::StoreError(format!(
            "invalid timestamp {} stored for '{}'",
            millis, resource
        ))
    })
}

fn collect_records(
    rows: impl Iterator<Item = rusqlite::Result<RawRecord>>,
) -> Result<Vec<LockRecord>> {
    rows.map(|row| {
        row.map_err(|e| LeaseError::StoreError(format!("failed to read lock row: {}", e)))
            .and_then(RawRecord::into_record)
    })
    .collect()
}

impl LockStore for SqliteLockStore {
    fn get(&self, resource: &str) -> Result<Option<LockRecord>> {
        let raw = self
            .conn()?
            .query_row(
                &format!("SELECT {SELECT_COLUMNS} FROM lease_locks WHERE resource = ?1"),
                params![resource],
                RawRecord::from_row,
            )
            .optional()
            .map_err(|e| LeaseError::StoreError(format!("failed to read lock '{}': {}", resource, e)))?;

        raw.map(RawRecord::into_record).transpose()
    }

    fn insert_if_absent(&self, record: &LockRecord) -> Result<bool> {
        let rows = self
            .conn()?
            .execute(
                "INSERT INTO lease_locks \
                 (resource, locked_at, updated_at, expires_at, status, holder, release_reason) \
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7) \
                 ON CONFLICT(resource) DO NOTHING",
                params![
                    record.resource,
                    record.locked_at.timestamp_millis(),
                    record.updated_at.timestamp_millis(),
                    record.expires_at.timestamp_millis(),
                    record.status.as_str(),
                    record.holder,
                    record.release_reason.map(|r| r.as_str()),
                ],
            )
            .map_err(|e| {
                LeaseError::StoreError(format!(
                    "failed to insert lock '{}': {}",
                    record.resource, e
                ))
            })?;
        Ok(rows > 0)
    }

    fn compare_and_update(
        &self,
        resource: &str,
        expected: &LockRecord,
        new: &LockRecord,
    ) -> Result<bool> {
        if new.resource != resource {
            return Err(LeaseError::StoreError(format!(
                "record for '{}' cannot be stored under '{}'",
                new.resource, resource
            )));
        }

        let rows = self
            .conn()?
            .execute(
                "UPDATE lease_locks \
                 SET locked_at = ?1, updated_at = ?2, expires_at = ?3, \
                     status = ?4, holder = ?5, release_reason = ?6 \
                 WHERE resource = ?7 \
                   AND locked_at = ?8 AND updated_at = ?9 AND expires_at = ?10 \
                   AND status = ?11 AND holder = ?12 AND release_reason IS ?13",
                params![
                    new.locked_at.timestamp_millis(),
                    new.updated_at.timestamp_millis(),
                    new.expires_at.timestamp_millis(),
                    new.status.as_str(),
                    new.holder,
                    new.release_reason.map(|r| r.as_str()),
                    resource,
                    expected.locked_at.timestamp_millis(),
                    expected.updated_at.timestamp_millis(),
                    expected.expires_at.timestamp_millis(),
                    expected.status.as_str(),
                    expected.holder,
                    expected.release_reason.map(|r| r.as_str()),
                ],
            )
            .map_err(|e| {
                LeaseError::StoreError(format!("failed to update lock '{}': {}", resource, e))
            })?;
        Ok(rows == 1)
    }

    fn conditional_delete(&self, resource: &str, condition: &DeleteCondition) -> Result<usize> {
        let conn = self.conn()?;
        let result = match *condition {
            DeleteCondition::Released { updated_before } => conn.execute(
                "DELETE FROM lease_locks \
                 WHERE resource = ?1 AND status = ?2 AND updated_at < ?3",
                params![
                    resource,
                    LockStatus::Released.as_str(),
                    updated_before.timestamp_millis()
                ],
            ),
            DeleteCondition::Reclaimable { now } => conn.execute(
                "DELETE FROM lease_locks \
                 WHERE resource = ?1 AND (status = ?2 OR (status = ?3 AND expires_at < ?4))",
                params![
                    resource,
                    LockStatus::Released.as_str(),
                    LockStatus::Locked.as_str(),
                    now.timestamp_millis()
                ],
            ),
        };
        result.map_err(|e| {
            LeaseError::StoreError(format!("failed to delete lock '{}': {}", resource, e))
        })
    }

    fn query_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        status: LockStatus,
    ) -> Result<Vec<LockRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM lease_locks \
                 WHERE status = ?1 AND expires_at < ?2 \
                 ORDER BY expires_at, resource"
            ))
            .map_err(|e| LeaseError::StoreError(format!("failed to prepare query: {}", e)))?;
        let rows = stmt
            .query_map(
                params![status.as_str(), cutoff.timestamp_millis()],
                RawRecord::from_row,
            )
            .map_err(|e| LeaseError::StoreError(format!("failed to query expired locks: {}", e)))?;
        collect_records(rows)
    }

    fn list(&self) -> Result<Vec<LockRecord>> {
        let conn = self.conn()?;
        let mut stmt = conn
            .prepare(&format!(
                "SELECT {SELECT_COLUMNS} FROM lease_locks ORDER BY resource"
            ))
            .map_err(|e| LeaseError::StoreError(format!("failed to prepare query: {}", e)))?;
        let rows = stmt
            .query_map([], RawRecord::from_row)
            .map_err(|e| LeaseError::StoreError(format!("failed to list locks: {}", e)))?;
        collect_records(rows)
    }

    fn backend_name(&self) -> &'static str {
        "sqlite"
    }
}
