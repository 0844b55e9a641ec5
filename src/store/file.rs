//! File-backed lock store.
//!
//! Each resource is one JSON document, `<encoded-resource>.lock`, inside the
//! store directory. Mutations run under an exclusive advisory lock on
//! `<dir>/.store.lock` and replace documents with atomic renames, so readers
//! never need the directory lock: they always see a whole document.
//!
//! Resource names are percent-encoded into file names: bytes outside
//! `[A-Za-z0-9_-]` and `.` in leading position become `%XX`. When the encoded
//! name would not fit in a single path component, the stem becomes an encoded
//! prefix, `~`, and the SHA-256 of the full name. `~` never appears in an
//! encoded name, so the two forms cannot collide.

use super::LockStore;
use crate::error::{LeaseError, Result};
use crate::fs::{DirLock, atomic_write_file};
use crate::record::{DeleteCondition, LockRecord, LockStatus};
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

const STORE_LOCK_FILE: &str = ".store.lock";
const RECORD_EXTENSION: &str = "lock";

// Longest stem kept verbatim; leaves room for the extension and temp-file
// suffixes under the usual 255-byte component limit.
const MAX_STEM_LEN: usize = 200;
const HASHED_PREFIX_LEN: usize = 64;

/// Lock store keeping one JSON file per resource.
#[derive(Debug, Clone)]
pub struct FileLockStore {
    dir: PathBuf,
}

impl FileLockStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir).map_err(|e| {
            LeaseError::StoreError(format!(
                "failed to create lock directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { dir })
    }

    /// The store directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the document holding `resource`.
    pub fn record_path(&self, resource: &str) -> PathBuf {
        self.dir
            .join(format!("{}.{}", file_stem(resource), RECORD_EXTENSION))
    }

    fn lock_dir(&self) -> Result<DirLock> {
        DirLock::exclusive(&self.dir.join(STORE_LOCK_FILE))
    }

    fn write_record(&self, record: &LockRecord) -> Result<()> {
        let json = serde_json::to_string_pretty(record).map_err(|e| {
            LeaseError::StoreError(format!(
                "failed to serialize lock '{}': {}",
                record.resource, e
            ))
        })?;
        atomic_write_file(self.record_path(&record.resource), &json)
    }

    fn remove_record(&self, resource: &str) -> Result<()> {
        let path = self.record_path(resource);
        fs::remove_file(&path).map_err(|e| {
            LeaseError::StoreError(format!(
                "failed to remove lock file '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Read every parseable record; unreadable documents are skipped with a warning.
    fn read_all(&self) -> Result<Vec<LockRecord>> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(LeaseError::StoreError(format!(
                    "failed to read lock directory '{}': {}",
                    self.dir.display(),
                    e
                )));
            }
        };

        let mut records = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| {
                LeaseError::StoreError(format!("failed to read lock directory entry: {}", e))
            })?;
            let path = entry.path();

            let is_record = path.extension().and_then(|e| e.to_str()) == Some(RECORD_EXTENSION)
                && !entry.file_name().to_string_lossy().starts_with('.');
            if !is_record {
                continue;
            }

            match read_record(&path) {
                Ok(Some(record)) => records.push(record),
                // Removed between read_dir and open.
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(path = %path.display(), error = %e, "skipping unreadable lock file");
                }
            }
        }
        Ok(records)
    }
}

fn read_record(path: &Path) -> Result<Option<LockRecord>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => {
            return Err(LeaseError::StoreError(format!(
                "failed to read lock file '{}': {}",
                path.display(),
                e
            )));
        }
    };

    serde_json::from_str(&content).map(Some).map_err(|e| {
        LeaseError::StoreError(format!(
            "failed to parse lock file '{}': {}",
            path.display(),
            e
        ))
    })
}

/// Percent-encode a resource name into a safe file stem.
pub fn encode_resource(resource: &str) -> String {
    let mut out = String::with_capacity(resource.len());
    for (i, byte) in resource.bytes().enumerate() {
        let keep = byte.is_ascii_alphanumeric()
            || byte == b'_'
            || byte == b'-'
            || (byte == b'.' && i > 0);
        if keep {
            out.push(byte as char);
        } else {
            out.push_str(&format!("%{:02X}", byte));
        }
    }
    out
}

/// File stem for `resource`, at most 200 bytes long.
pub fn file_stem(resource: &str) -> String {
    let encoded = encode_resource(resource);
    if encoded.len() <= MAX_STEM_LEN {
        return encoded;
    }
    // Encoded names are ASCII, so any byte offset is a char boundary.
    let digest = Sha256::digest(resource.as_bytes());
    format!("{}~{:x}", &encoded[..HASHED_PREFIX_LEN], digest)
}

impl LockStore for FileLockStore {
    fn get(&self, resource: &str) -> Result<Option<LockRecord>> {
        read_record(&self.record_path(resource))
    }

    fn insert_if_absent(&self, record: &LockRecord) -> Result<bool> {
        let _guard = self.lock_dir()?;
        if self.record_path(&record.resource).exists() {
            return Ok(false);
        }
        self.write_record(record)?;
        Ok(true)
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

        let _guard = self.lock_dir()?;
        match read_record(&self.record_path(resource))? {
            Some(current) if current == *expected => {
                self.write_record(new)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn conditional_delete(&self, resource: &str, condition: &DeleteCondition) -> Result<usize> {
        let _guard = self.lock_dir()?;
        match read_record(&self.record_path(resource))? {
            Some(current) if condition.matches(&current) => {
                self.remove_record(resource)?;
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn query_expired_before(
        &self,
        cutoff: DateTime<Utc>,
        status: LockStatus,
    ) -> Result<Vec<LockRecord>> {
        let mut expired: Vec<LockRecord> = self
            .read_all()?
            .into_iter()
            .filter(|r| r.status == status && r.expires_at < cutoff)
            .collect();
        expired.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.resource.cmp(&b.resource))
        });
        Ok(expired)
    }

    fn list(&self) -> Result<Vec<LockRecord>> {
        let mut all = self.read_all()?;
        all.sort_by(|a, b| a.resource.cmp(&b.resource));
        Ok(all)
    }

    fn backend_name(&self) -> &'static str {
        "file"
    }
}
