//! Configuration types and defaults for leaselock.
//!
//! This module defines the store section, the backend enum, and the default
//! value functions used by the Config struct.

use crate::error::LeaseError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Name of the config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "leaselock.yaml";

/// Lock store backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    /// Process-local map; nothing survives the process.
    Memory,
    /// One JSON document per resource in a directory.
    File,
    /// SQLite database file (default).
    #[default]
    Sqlite,
}

impl StoreBackend {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File => "file",
            Self::Sqlite => "sqlite",
        }
    }

    /// Where the store lives when `store.path` is not set.
    pub fn default_path(&self) -> Option<PathBuf> {
        match self {
            Self::Memory => None,
            Self::File => Some(PathBuf::from(".leaselock/locks")),
            Self::Sqlite => Some(PathBuf::from(".leaselock/locks.db")),
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = LeaseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(LeaseError::UserError(format!(
                "unknown store backend '{}' (expected memory, file or sqlite)",
                other
            ))),
        }
    }
}

/// Where lock records are kept.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend kind.
    pub backend: StoreBackend,

    /// Database file (sqlite) or directory (file). Ignored for memory.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

impl StoreConfig {
    /// The configured path, or the backend default.
    pub fn resolved_path(&self) -> Option<PathBuf> {
        match self.backend {
            StoreBackend::Memory => None,
            _ => self.path.clone().or_else(|| self.backend.default_path()),
        }
    }
}

// Default value functions for serde
pub(crate) fn default_lease_ms() -> u64 {
    2000
}
pub(crate) fn default_sweep_interval_secs() -> u64 {
    900
}
pub(crate) fn default_retain_released_secs() -> u64 {
    86_400
}
