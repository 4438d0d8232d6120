//! `hidapi` backend.
//!
//! [`HidApiProvider`] refreshes the OS device list on every probe, and
//! [`HidReportSource`] reads reports with a bounded wait. hidapi strips the
//! report-ID byte for devices that do not use numbered reports, so a
//! ShuttleXpress read is exactly its 5-byte payload.

use crate::device::{DeviceIdentity, DeviceProvider, ReportSource};
use crate::error::{Result, WatchError};
use crate::metadata::DeviceMeta;
use hidapi::{DeviceInfo, HidApi, HidDevice};
use std::time::Duration;

/// Read buffer size when the report length is unknown (full-speed HID max).
const DEFAULT_READ_BUF_LEN: usize = 64;

/// Buffer for `report_len` payload bytes plus a report-ID byte.
fn read_buf_len(report_len: Option<usize>) -> usize {
    report_len.map_or(DEFAULT_READ_BUF_LEN, |len| len + 1)
}

pub struct HidApiProvider {
    api: HidApi,
    /// Entries from the last `enumerate`, used to find the one to open.
    listed: Vec<DeviceInfo>,
}

impl HidApiProvider {
    pub fn new() -> Result<Self> {
        Ok(Self {
            api: HidApi::new()?,
            listed: Vec::new(),
        })
    }
}

impl DeviceProvider for HidApiProvider {
    fn enumerate(&mut self) -> Result<Vec<DeviceMeta>> {
        self.api.refresh_devices()?;
        self.listed = self.api.device_list().cloned().collect();
        Ok(self.listed.iter().map(meta).collect())
    }

    fn open(&mut self, wanted: &DeviceMeta) -> Result<Box<dyn ReportSource>> {
        let info = self
            .listed
            .iter()
            .find(|info| wanted.path.as_deref() == Some(&*info.path().to_string_lossy()))
            .ok_or_else(|| WatchError::OpenFailed {
                identity: DeviceIdentity::new(
                    wanted.vid.unwrap_or_default(),
                    wanted.pid.unwrap_or_default(),
                ),
                reason: "device is no longer listed".into(),
            })?;

        let device = info.open_device(&self.api)?;
        // The watcher bounds each wait itself; see `read_report`.
        device.set_blocking_mode(true)?;

        tracing::debug!(
            vid = format_args!("{:04x}", info.vendor_id()),
            pid = format_args!("{:04x}", info.product_id()),
            serial = info.serial_number().unwrap_or(""),
            product = info.product_string().unwrap_or(""),
            path = %info.path().to_string_lossy(),
            "hid device opened"
        );

        Ok(Box::new(HidReportSource::new(device)))
    }
}

/// An open `hidapi` handle.
pub struct HidReportSource {
    raw: Option<HidDevice>,
    buf: Vec<u8>,
}

impl HidReportSource {
    pub fn new(device: HidDevice) -> Self {
        Self {
            raw: Some(device),
            buf: vec![0u8; read_buf_len(None)],
        }
    }
}

impl ReportSource for HidReportSource {
    fn read_report(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let Some(device) = self.raw.as_ref() else {
            return Err(WatchError::DeviceRemoved);
        };
        let ms = i32::try_from(timeout.as_millis()).unwrap_or(i32::MAX);
        match device.read_timeout(&mut self.buf, ms)? {
            0 => Ok(None),
            n => Ok(Some(self.buf[..n].to_vec())),
        }
    }

    fn is_open(&self) -> bool {
        self.raw.is_some()
    }

    fn close(&mut self) {
        // Dropping the HidDevice closes the OS handle.
        self.raw = None;
    }

    fn set_report_len(&mut self, len: usize) {
        self.buf = vec![0u8; read_buf_len(Some(len))];
    }
}

/// Build a [`DeviceMeta`] snapshot for a `hidapi` device entry.
///
/// Fields are best-effort; unknown values remain `None`.
fn meta(info: &DeviceInfo) -> DeviceMeta {
    let interface_number = {
        let n = info.interface_number();
        if n >= 0 {
            Some(n)
        } else {
            None
        }
    };
    DeviceMeta {
        bus: Some("usb".into()),
        vid: Some(info.vendor_id()),
        pid: Some(info.product_id()),
        product_string: info.product_string().map(|s| s.to_string()),
        serial_number: info.serial_number().map(|s| s.to_string()),
        usage_page: Some(info.usage_page()),
        usage: Some(info.usage()),
        interface_number,
        path: Some(info.path().to_string_lossy().to_string()),
    }
}
