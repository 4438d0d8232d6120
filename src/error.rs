//! Error taxonomy.
//!
//! Nothing in this crate is fatal to the host: a missing device keeps the
//! watcher scanning, a failed open is retried on the next probe, a short
//! report is skipped and a removal triggers a rescan. These variants exist so
//! that backends can say *why* something did not work, and so the watcher can
//! log it.

use crate::device::DeviceIdentity;

/// Crate-wide result alias.
pub type Result<T> = std::result::Result<T, WatchError>;

#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// No enumerated device matched the identity on this probe.
    #[error("no HID device matching {0}")]
    DeviceNotFound(DeviceIdentity),

    /// A matching device was found but could not be opened.
    #[error("failed to open {identity}: {reason}")]
    OpenFailed {
        identity: DeviceIdentity,
        reason: String,
    },

    /// A report was too short to decode.
    #[error("malformed report ({len} bytes)")]
    MalformedReport { len: usize },

    /// The device went away; the handle is stale.
    #[error("device removed")]
    DeviceRemoved,

    /// The watcher was disposed and cannot be restarted.
    #[error("watcher has been disposed")]
    Disposed,

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[cfg(feature = "hid")]
    #[error("hidapi: {0}")]
    Hid(#[from] hidapi::HidError),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("config serialize error: {0}")]
    ConfigSerialize(#[from] toml::ser::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The worker thread could not be started.
    #[error("failed to spawn watcher thread: {0}")]
    Spawn(#[source] std::io::Error),
}

impl WatchError {
    /// True for errors that mean the open handle is no longer usable.
    pub fn is_removal(&self) -> bool {
        match self {
            WatchError::DeviceRemoved => true,
            #[cfg(feature = "hid")]
            WatchError::Hid(_) => true,
            WatchError::Io(_) => true,
            _ => false,
        }
    }
}
