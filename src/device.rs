//! Device-facing traits and identity.
//!
//! The watcher never talks to an OS API directly. Instead it goes through two
//! small seams that backends implement:
//!
//! - [`DeviceProvider`] enumerates what is plugged in and opens a handle.
//! - [`ReportSource`] is an open handle that yields raw input reports.
//!
//! Raw reports are turned into [`ShuttleEvent`]s by a [`ReportParser`]. The
//! parser is stateful (it remembers the previous report), so exactly one
//! parser instance belongs to each open device.
//!
//! ## Identity
//! A [`DeviceIdentity`] is the `(vendor_id, product_id)` pair the watcher is
//! looking for. It is set when the watcher is built and never changes. Only an
//! exact match on both fields is accepted.

use crate::error::Result;
use crate::event::ShuttleEvent;
use crate::metadata::DeviceMeta;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// The hardware class a watcher targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceIdentity {
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceIdentity {
    /// Contour Design ShuttleXpress.
    pub const SHUTTLE_XPRESS: DeviceIdentity = DeviceIdentity::new(0x0b33, 0x0020);

    pub const fn new(vendor_id: u16, product_id: u16) -> Self {
        Self {
            vendor_id,
            product_id,
        }
    }

    /// Exact VID/PID match against an enumerated device.
    ///
    /// Entries that do not report a VID or PID never match.
    pub fn matches(&self, meta: &DeviceMeta) -> bool {
        meta.vid == Some(self.vendor_id) && meta.pid == Some(self.product_id)
    }
}

impl fmt::Display for DeviceIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}

/// An open connection to one physical device.
///
/// Implementations are owned by the watcher's worker thread and are never
/// shared. Once [`read_report`](ReportSource::read_report) has reported a
/// removal the handle is considered stale and is dropped.
pub trait ReportSource: Send {
    /// Wait up to `timeout` for the next input report.
    ///
    /// - `Ok(Some(bytes))`: one report (without any report-ID prefix the OS strips).
    /// - `Ok(None)`: nothing arrived; the caller simply asks again.
    /// - `Err(_)`: the handle is no longer usable (usually the device was unplugged).
    fn read_report(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>>;

    /// Whether the handle is still open.
    fn is_open(&self) -> bool;

    /// Release the OS handle. Calling this twice is harmless.
    fn close(&mut self);

    /// Size reads for reports of `len` bytes (payload, without a report ID).
    ///
    /// Called once right after open when the parser knows its report size.
    fn set_report_len(&mut self, _len: usize) {}
}

/// Host-side device enumeration and opening.
pub trait DeviceProvider: Send {
    /// List every HID device currently visible to the host.
    fn enumerate(&mut self) -> Result<Vec<DeviceMeta>>;

    /// Open one of the devices previously returned by [`enumerate`](DeviceProvider::enumerate).
    fn open(&mut self, meta: &DeviceMeta) -> Result<Box<dyn ReportSource>>;
}

/// Turns raw report bytes into semantic events.
///
/// Parsers keep whatever state they need between reports (e.g. the previous
/// report for edge detection). The watcher calls [`reset`](ReportParser::reset)
/// whenever the device goes away so a re-attached unit starts from a clean
/// slate.
pub trait ReportParser: Send {
    /// Decode one report, appending any resulting events to `out`.
    ///
    /// `report_id` is `0` unless [`expects_report_id_prefix`](ReportParser::expects_report_id_prefix)
    /// is true, in which case it is the first byte of the raw read and
    /// `payload` is the remainder.
    fn parse(&mut self, report_id: u8, payload: &[u8], out: &mut Vec<ShuttleEvent>);

    /// Forget any state carried between reports.
    fn reset(&mut self);

    /// Whether raw reads start with a report-ID byte that must be split off.
    fn expects_report_id_prefix(&self) -> bool {
        false
    }

    /// Expected input report size, if the parser knows it.
    ///
    /// The watcher passes it to [`ReportSource::set_report_len`] on attach.
    fn input_report_len(&self) -> Option<usize> {
        None
    }
}

/// Split `[report_id][payload...]`.
///
/// An empty read yields report ID `0` and an empty payload.
#[inline]
pub(crate) fn split_report_id(data: &[u8]) -> (u8, &[u8]) {
    match data.split_first() {
        Some((id, rest)) => (*id, rest),
        None => (0, &[]),
    }
}
