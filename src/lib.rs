//! shuttlewatch — hot-plug watcher and input decoder for USB HID jog-shuttles.
//!
//! A [`Watcher`] scans for a device by vendor/product id, opens it when it
//! shows up, decodes every input report into [`ShuttleEvent`]s and hands them
//! to subscribers. When the device is unplugged it tears down and scans again.
//!
//! The default decoder understands the Contour ShuttleXpress: the outer jog
//! ring, the inner wheel and five buttons. Other devices can be supported with
//! a custom [`ReportParser`].

#![cfg_attr(docsrs, feature(doc_cfg))]

pub mod backends;
pub mod config;
pub mod device;
pub mod error;
pub mod event;
pub mod eventbus;
pub mod filtered_listener;
pub mod logger;
pub mod manager;
pub mod metadata;
pub mod shuttle;

pub use config::WatchConfig;
pub use device::{DeviceIdentity, DeviceProvider, ReportParser, ReportSource};
pub use error::{Result, WatchError};
pub use event::*;
pub use eventbus::*;
pub use filtered_listener::FilteredListener;
pub use logger::TracingLogger;
pub use manager::{WatchState, Watcher};
pub use metadata::DeviceMeta;
pub use shuttle::{decode, wrap_diff, Decoded, ShuttleDecoder};
