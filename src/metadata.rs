//! Device metadata snapshot.
//!
//! [`DeviceMeta`] describes one enumerated HID entry. Backends fill in what
//! they know; unknown fields stay `None`. The watcher matches on `vid`/`pid`
//! and hands the matched entry back to the backend's `open`, and it is carried
//! in `Attached`/`Removed` events so consumers can tell which unit came and
//! went.
//!
//! # Conventions
//! - `bus` is a short hint like `"usb"` or `"virtual"`.
//! - `path` is an OS/topology path (opaque string). Backends use it to find
//!   the entry again when opening; it may change across ports and reconnects.
//! - `vid`/`pid` and `serial_number` (when present) are stable across replugs.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Snapshot of metadata describing a single device.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMeta {
    /// High-level bus classification (e.g., `"usb"`, `"virtual"`).
    pub bus: Option<String>,

    /// USB Vendor ID (VID), if known.
    pub vid: Option<u16>,

    /// USB Product ID (PID), if known.
    pub pid: Option<u16>,

    /// Human-readable product name from the driver/firmware.
    pub product_string: Option<String>,

    /// Device serial number supplied by firmware/OS, if present.
    pub serial_number: Option<String>,

    /// HID interface index (platform-reported). `None` when not applicable.
    pub interface_number: Option<i32>,

    /// HID Usage Page, if known.
    pub usage_page: Option<u16>,

    /// HID Usage within the page, if known.
    pub usage: Option<u16>,

    /// OS/topological path to the device. Opaque.
    pub path: Option<String>,
}

impl DeviceMeta {
    /// Friendly name for logs: product string, else `vid:pid`, else `"unknown"`.
    pub fn label(&self) -> String {
        if let Some(name) = self.product_string.as_deref().filter(|s| !s.is_empty()) {
            return name.to_string();
        }
        match (self.vid, self.pid) {
            (Some(v), Some(p)) => format!("{v:04x}:{p:04x}"),
            _ => "unknown".to_string(),
        }
    }
}

impl fmt::Display for DeviceMeta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())?;
        if let Some(path) = &self.path {
            write!(f, " @ {path}")?;
        }
        Ok(())
    }
}
