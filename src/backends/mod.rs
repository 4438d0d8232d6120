//! Device backends for `shuttlewatch`.
//!
//! Implementations of [`DeviceProvider`](crate::device::DeviceProvider) and
//! [`ReportSource`](crate::device::ReportSource).
//!
//! # Feature flags
//! - **`hid`** (default): [`hid::HidApiProvider`], real devices through `hidapi`.
//!
//! [`virtual_input`] is always available. It backs the test suite and lets an
//! application be exercised without hardware.

#[cfg(feature = "hid")]
#[cfg_attr(docsrs, doc(cfg(feature = "hid")))]
pub mod hid;

pub mod virtual_input;
