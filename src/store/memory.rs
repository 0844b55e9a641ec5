//! In-memory lock store.

use super::LockStore;
use crate::error::{LeaseError, Result};
use crate::record::{DeleteCondition, LockRecord, LockStatus};
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory lock store.
///
/// ## Limitations
/// - Not persistent (records are lost on restart)
/// - Not shared between processes; clones share the same map
#[derive(Clone, Default)]
pub struct MemoryLockStore {
    records: Arc<RwLock<HashMap<String, LockRecord>>>,
}

impl MemoryLockStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, LockRecord>>> {
        self.records
            .read()
            .map_err(|_| LeaseError::StoreError("memory store lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, LockRecord>>> {
        self.records
            .write()
            .map_err(|_| LeaseError::StoreError("memory store lock poisoned".to_string()))
    }
}

impl LockStore for MemoryLockStore {
    fn get(&self, resource: &str) -> Result<Option<LockRecord>> {
        Ok(self.read()?.get(resource).cloned())
    }

    fn insert_if_absent(&self, record: &LockRecord) -> Result<bool> {
        let mut records = self.write()?;
        if records.contains_key(&record.resource) {
            return Ok(false);
        }
        records.insert(record.resource.clone(), record.clone());
        Ok(true)
    }

    fn compare_and_update(
        &self,
        resource: &str,
        expected: &LockRecord,
        new: &LockRecord,
    ) -> Result<bool> {
        let mut records = self.write()?;
        match records.get_mut(resource) {
            Some(current) if current == expected => {
                *current = new.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    fn conditional_delete(&self, resource: &str, condition: &DeleteCondition) -> Result<usize> {
        let mut records = self.write()?;
        match records.get(resource) {
            Some(current) if condition.matches(current) => {
                records.remove(resource);
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
        let records = self.read()?;
        let mut expired: Vec<LockRecord> = records
            .values()
            .filter(|r| r.status == status && r.expires_at < cutoff)
            .cloned()
            .collect();
        expired.sort_by(|a, b| {
            a.expires_at
                .cmp(&b.expires_at)
                .then_with(|| a.resource.cmp(&b.resource))
        });
        Ok(expired)
    }

    fn list(&self) -> Result<Vec<LockRecord>> {
        let mut all: Vec<LockRecord> = self.read()?.values().cloned().collect();
        all.sort_by(|a, b| a.resource.cmp(&b.resource));
        Ok(all)
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
