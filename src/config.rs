//! Watcher configuration.
//!
//! [`WatchConfig`] is plain serde data and is usually loaded from TOML:
//!
//! ```toml
//! vendor_id = 0x0b33
//! product_id = 0x0020
//! scan_interval_ms = 5000
//! read_timeout_ms = 100
//! ```
//!
//! Every field has a default, so an empty file yields a ShuttleXpress watcher.

use crate::device::DeviceIdentity;
use crate::error::{Result, WatchError};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 5000;
pub const DEFAULT_READ_TIMEOUT_MS: u64 = 100;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    pub vendor_id: u16,
    pub product_id: u16,
    /// Delay between probes while no device is attached.
    pub scan_interval_ms: u64,
    /// Upper bound on a single report wait. Only affects how quickly a
    /// disposal is noticed; an expired wait is just "no report".
    pub read_timeout_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            vendor_id: DeviceIdentity::SHUTTLE_XPRESS.vendor_id,
            product_id: DeviceIdentity::SHUTTLE_XPRESS.product_id,
            scan_interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            read_timeout_ms: DEFAULT_READ_TIMEOUT_MS,
        }
    }
}

impl WatchConfig {
    pub fn for_identity(identity: DeviceIdentity) -> Self {
        Self {
            vendor_id: identity.vendor_id,
            product_id: identity.product_id,
            ..Default::default()
        }
    }

    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval_ms = duration_ms(interval);
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn identity(&self) -> DeviceIdentity {
        DeviceIdentity::new(self.vendor_id, self.product_id)
    }

    pub fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms)
    }

    pub fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    /// Reject values the watcher cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval_ms == 0 {
            return Err(WatchError::InvalidConfig(
                "scan_interval_ms must be greater than zero".into(),
            ));
        }
        if self.read_timeout_ms == 0 {
            return Err(WatchError::InvalidConfig(
                "read_timeout_ms must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    /// Parse and validate a TOML document.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let cfg: WatchConfig = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}

fn duration_ms(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}
