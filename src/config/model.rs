//! Config struct definition and default implementation.

use super::types::*;
use serde::{Deserialize, Serialize};

/// Configuration for leaselock.
///
/// This struct represents the contents of `leaselock.yaml`.
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    // =========================================================================
    // Store settings
    // =========================================================================
    /// Backend and location of the lock store.
    pub store: StoreConfig,

    // =========================================================================
    // Lease settings
    // =========================================================================
    /// Lease length in milliseconds used when a caller asks for none.
    #[serde(default = "default_lease_ms")]
    pub default_lease_ms: u64,

    /// Holder identity for this instance. Falls back to the environment.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub holder_id: Option<String>,

    // =========================================================================
    // Housekeeping settings
    // =========================================================================
    /// Seconds between expiry sweeps in watch mode.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,

    /// Seconds a released record is kept before `purge` removes it.
    #[serde(default = "default_retain_released_secs")]
    pub retain_released_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            default_lease_ms: default_lease_ms(),
            holder_id: None,
            sweep_interval_secs: default_sweep_interval_secs(),
            retain_released_secs: default_retain_released_secs(),
        }
    }
}
