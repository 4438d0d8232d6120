//! In-memory devices.
//!
//! A [`VirtualShuttle`] is a device you can plug, unplug and feed raw reports
//! into from any thread. A [`VirtualProvider`] enumerates a set of them the way
//! an OS would. Reports fed while no handle is open are dropped, just like a
//! physical device nobody is reading from.

use crate::device::{DeviceIdentity, DeviceProvider, ReportSource};
use crate::error::{Result, WatchError};
use crate::metadata::DeviceMeta;
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Default)]
struct Plug {
    plugged: bool,
    /// Sender half of the currently open handle, if any.
    open: Option<Sender<Vec<u8>>>,
    fail_next_opens: usize,
    opens: usize,
    /// Report size the reader asked for, if any.
    report_len: Option<usize>,
}

struct Shared {
    meta: DeviceMeta,
    state: Mutex<Plug>,
}

/// A scriptable device. Clones refer to the same device.
#[derive(Clone)]
pub struct VirtualShuttle {
    shared: Arc<Shared>,
}

impl VirtualShuttle {
    /// A new, unplugged device with the given identity and path.
    pub fn new(identity: DeviceIdentity, path: &str) -> Self {
        let meta = DeviceMeta {
            bus: Some("virtual".into()),
            vid: Some(identity.vendor_id),
            pid: Some(identity.product_id),
            product_string: Some("Virtual ShuttleXpress".into()),
            path: Some(path.to_string()),
            ..Default::default()
        };
        Self {
            shared: Arc::new(Shared {
                meta,
                state: Mutex::new(Plug::default()),
            }),
        }
    }

    /// A ShuttleXpress at `virtual:0`.
    pub fn shuttle_xpress() -> Self {
        Self::new(DeviceIdentity::SHUTTLE_XPRESS, "virtual:0")
    }

    pub fn meta(&self) -> &DeviceMeta {
        &self.shared.meta
    }

    pub fn plug(&self) {
        self.shared.state.lock().plugged = true;
    }

    /// Unplug; any open handle reports removal on its next read.
    pub fn unplug(&self) {
        let mut st = self.shared.state.lock();
        st.plugged = false;
        st.open = None;
    }

    pub fn is_plugged(&self) -> bool {
        self.shared.state.lock().plugged
    }

    /// Whether a handle is currently open and reading.
    pub fn is_open(&self) -> bool {
        self.shared.state.lock().open.is_some()
    }

    /// Make the next `n` open attempts fail.
    pub fn fail_next_opens(&self, n: usize) {
        self.shared.state.lock().fail_next_opens = n;
    }

    /// Number of successful opens so far.
    pub fn opens(&self) -> usize {
        self.shared.state.lock().opens
    }

    /// Report size announced by the current reader via `set_report_len`.
    pub fn report_len(&self) -> Option<usize> {
        self.shared.state.lock().report_len
    }

    /// Deliver one raw report to the open handle.
    ///
    /// Returns `false` when nobody is reading (unplugged, or not yet opened).
    pub fn feed(&self, report: &[u8]) -> bool {
        let mut st = self.shared.state.lock();
        let Some(tx) = st.open.as_ref() else {
            return false;
        };
        if tx.send(report.to_vec()).is_ok() {
            return true;
        }
        // Reader went away without an unplug.
        st.open = None;
        false
    }

    fn open_handle(&self) -> Result<VirtualHandle> {
        let mut st = self.shared.state.lock();
        let identity = DeviceIdentity::new(
            self.shared.meta.vid.unwrap_or_default(),
            self.shared.meta.pid.unwrap_or_default(),
        );
        if !st.plugged {
            return Err(WatchError::DeviceNotFound(identity));
        }
        if st.fail_next_opens > 0 {
            st.fail_next_opens -= 1;
            return Err(WatchError::OpenFailed {
                identity,
                reason: "simulated open failure".into(),
            });
        }
        let (tx, rx) = crossbeam_channel::unbounded();
        st.open = Some(tx);
        st.opens += 1;
        st.report_len = None;
        Ok(VirtualHandle {
            rx: Some(rx),
            generation: st.opens,
            owner: self.clone(),
        })
    }
}

impl std::fmt::Debug for VirtualShuttle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VirtualShuttle")
            .field("meta", &self.shared.meta)
            .field("plugged", &self.is_plugged())
            .finish()
    }
}

/// Open handle on a [`VirtualShuttle`].
pub struct VirtualHandle {
    rx: Option<Receiver<Vec<u8>>>,
    /// Value of `opens` when this handle was created.
    generation: usize,
    owner: VirtualShuttle,
}

impl ReportSource for VirtualHandle {
    fn read_report(&mut self, timeout: Duration) -> Result<Option<Vec<u8>>> {
        let Some(rx) = self.rx.as_ref() else {
            return Err(WatchError::DeviceRemoved);
        };
        match rx.recv_timeout(timeout) {
            Ok(report) => Ok(Some(report)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => {
                self.rx = None;
                Err(WatchError::DeviceRemoved)
            }
        }
    }

    fn is_open(&self) -> bool {
        self.rx.is_some()
    }

    fn close(&mut self) {
        if self.rx.take().is_some() {
            let mut st = self.owner.shared.state.lock();
            if st.opens == self.generation {
                st.open = None;
            }
        }
    }

    fn set_report_len(&mut self, len: usize) {
        let mut st = self.owner.shared.state.lock();
        if st.opens == self.generation {
            st.report_len = Some(len);
        }
    }
}

impl Drop for VirtualHandle {
    fn drop(&mut self) {
        self.close();
    }
}

/// Enumerates a fixed set of virtual devices; only plugged ones are listed.
#[derive(Debug, Default)]
pub struct VirtualProvider {
    devices: Vec<VirtualShuttle>,
}

impl VirtualProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, device: VirtualShuttle) -> Self {
        self.devices.push(device);
        self
    }

    pub fn add_device(&mut self, device: VirtualShuttle) {
        self.devices.push(device);
    }
}

impl DeviceProvider for VirtualProvider {
    fn enumerate(&mut self) -> Result<Vec<DeviceMeta>> {
        Ok(self
            .devices
            .iter()
            .filter(|d| d.is_plugged())
            .map(|d| d.meta().clone())
            .collect())
    }

    fn open(&mut self, meta: &DeviceMeta) -> Result<Box<dyn ReportSource>> {
        let device = self
            .devices
            .iter()
            .find(|d| d.meta().path == meta.path)
            .ok_or_else(|| {
                WatchError::DeviceNotFound(DeviceIdentity::new(
                    meta.vid.unwrap_or_default(),
                    meta.pid.unwrap_or_default(),
                ))
            })?;
        Ok(Box::new(device.open_handle()?))
    }
}
