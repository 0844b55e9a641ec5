//! Config loading, validation, and store construction.

use super::model::Config;
use super::types::StoreBackend;
use crate::error::{LeaseError, Result};
use crate::manager::{LockManager, MAX_LEASE_MILLIS};
use crate::store::{FileLockStore, LockStore, MemoryLockStore, SqliteLockStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

impl Config {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the config file
    ///
    /// # Returns
    ///
    /// * `Ok(Config)` - Successfully loaded and validated config
    /// * `Err(LeaseError::UserError)` - Read error, parse error or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            LeaseError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from `path` if the file exists, defaults otherwise.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Parse config from a YAML string.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LeaseError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self).map_err(|e| {
            LeaseError::UserError(format!("failed to serialize config to YAML: {}", e))
        })
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `default_lease_ms` must be positive and at most one year
    /// - `sweep_interval_secs` and `retain_released_secs` must be positive
    /// - `holder_id`, if set, must not be blank
    /// - `store.path`, if set, must not be empty
    pub fn validate(&self) -> Result<()> {
        if self.default_lease_ms == 0 {
            return Err(LeaseError::UserError(
                "config validation failed: default_lease_ms must be greater than 0".to_string(),
            ));
        }
        if self.default_lease_ms > MAX_LEASE_MILLIS as u64 {
            return Err(LeaseError::UserError(format!(
                "config validation failed: default_lease_ms must be at most {}",
                MAX_LEASE_MILLIS
            )));
        }

        if self.sweep_interval_secs == 0 {
            return Err(LeaseError::UserError(
                "config validation failed: sweep_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.retain_released_secs == 0 {
            return Err(LeaseError::UserError(
                "config validation failed: retain_released_secs must be greater than 0"
                    .to_string(),
            ));
        }

        if let Some(holder) = &self.holder_id
            && holder.trim().is_empty()
        {
            return Err(LeaseError::UserError(
                "config validation failed: holder_id must not be blank".to_string(),
            ));
        }

        if let Some(path) = &self.store.path
            && path.as_os_str().is_empty()
        {
            return Err(LeaseError::UserError(
                "config validation failed: store.path must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// Lease applied when a caller asks for a non-positive one.
    pub fn default_lease(&self) -> Duration {
        Duration::from_millis(self.default_lease_ms)
    }

    /// Interval between sweeps in watch mode.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// How long released records are kept.
    pub fn retain_released(&self) -> Duration {
        Duration::from_secs(self.retain_released_secs)
    }

    /// Open the configured store.
    pub fn open_store(&self) -> Result<Arc<dyn LockStore>> {
        let path = self.store.resolved_path();
        let store: Arc<dyn LockStore> = match (self.store.backend, path) {
            (StoreBackend::Memory, _) => Arc::new(MemoryLockStore::new()),
            (StoreBackend::File, Some(dir)) => Arc::new(FileLockStore::open(dir)?),
            (StoreBackend::Sqlite, Some(db)) => Arc::new(SqliteLockStore::open(db)?),
            (backend, None) => {
                return Err(LeaseError::UserError(format!(
                    "store backend '{}' requires a path",
                    backend
                )));
            }
        };
        tracing::debug!(backend = store.backend_name(), "lock store opened");
        Ok(store)
    }

    /// Build a lock manager over the configured store.
    pub fn manager(&self) -> Result<LockManager> {
        Ok(LockManager::new(self.open_store()?).with_default_lease(self.default_lease()))
    }
}
