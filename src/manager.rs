//! Hot-plug watcher.
//!
//! A [`Watcher`] owns one worker thread that alternates between two phases:
//!
//! 1. **Scanning**: enumerate devices, pick the first exact VID/PID match and
//!    try to open it. On failure, wait `scan_interval` and try again, forever.
//! 2. **Attached**: read one report, decode it, dispatch the events, read the
//!    next one. A read that yields nothing is skipped and the next read issued
//!    immediately. A read error means the device is gone.
//!
//! Because both phases run on the same thread they can never overlap, and
//! reports are decoded strictly one at a time in arrival order.
//!
//! # Teardown
//! [`Watcher::dispose`] stops the worker, closes the device handle and drops
//! every listener. It is idempotent and may be called from any thread,
//! including from inside a listener callback (in which case the worker is not
//! joined; it exits right after the callback returns).
//!
//! ```no_run
//! use shuttlewatch::backends::virtual_input::{VirtualProvider, VirtualShuttle};
//! use shuttlewatch::{EventFilter, ShuttleEvent, WatchConfig, Watcher};
//!
//! let shuttle = VirtualShuttle::shuttle_xpress();
//! let provider = VirtualProvider::new().with_device(shuttle.clone());
//! let watcher = Watcher::new(WatchConfig::default(), provider).expect("config");
//! watcher.add_listener(
//!     |e: &ShuttleEvent| println!("{e:?}"),
//!     EventFilter::All,
//! );
//! watcher.scan_for_device().expect("start");
//! shuttle.plug();
//! std::thread::sleep(std::time::Duration::from_secs(6));
//! shuttle.feed(&[0, 0, 0, 0x10, 0]);
//! watcher.dispose();
//! ```

use crate::config::WatchConfig;
use crate::device::{split_report_id, DeviceIdentity, DeviceProvider, ReportParser, ReportSource};
use crate::error::{Result, WatchError};
use crate::event::ShuttleEvent;
use crate::eventbus::{EventFilter, ListenerId, ShuttleEventBus, ShuttleListener};
use crate::metadata::DeviceMeta;
use crate::shuttle::ShuttleDecoder;
use crossbeam_channel::Receiver;
use parking_lot::{Condvar, Mutex};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Where a watcher is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WatchState {
    /// Built but `scan_for_device` not called yet.
    Idle,
    /// Probing for the device.
    Scanning,
    /// A device is open and being read.
    Attached,
    /// Torn down for good.
    Disposed,
}

/// State shared between the handle and the worker thread.
struct Shared {
    identity: DeviceIdentity,
    scan_interval_ms: AtomicU64,
    read_timeout: Duration,
    stopped: Mutex<bool>,
    wake: Condvar,
    state: Mutex<WatchState>,
}

impl Shared {
    fn is_stopped(&self) -> bool {
        *self.stopped.lock()
    }

    fn request_stop(&self) {
        *self.stopped.lock() = true;
        self.wake.notify_all();
    }

    /// Sleep one scan interval unless stopped or woken first. Returns whether
    /// we are stopped.
    fn wait_or_stop(&self) -> bool {
        let mut stopped = self.stopped.lock();
        if !*stopped {
            let timeout = self.scan_interval();
            self.wake.wait_for(&mut stopped, timeout);
        }
        *stopped
    }

    /// Store a new interval and cut any pending wait short.
    fn set_scan_interval_ms(&self, ms: u64) {
        let _stopped = self.stopped.lock();
        self.scan_interval_ms.store(ms, Ordering::Relaxed);
        self.wake.notify_all();
    }

    fn scan_interval(&self) -> Duration {
        Duration::from_millis(self.scan_interval_ms.load(Ordering::Relaxed))
    }

    fn set_state(&self, next: WatchState) {
        let mut state = self.state.lock();
        if *state != WatchState::Disposed {
            *state = next;
        }
    }
}

enum Worker {
    /// Not started; holds what the thread will own.
    Ready {
        provider: Box<dyn DeviceProvider>,
        parser: Box<dyn ReportParser>,
    },
    Running(JoinHandle<()>),
    Finished,
}

/// Watches for one device class and dispatches its input.
pub struct Watcher {
    shared: Arc<Shared>,
    bus: ShuttleEventBus,
    worker: Mutex<Worker>,
}

impl Watcher {
    /// Watcher decoding ShuttleXpress reports from `provider`.
    pub fn new(config: WatchConfig, provider: impl DeviceProvider + 'static) -> Result<Self> {
        Self::with_parser(config, provider, ShuttleDecoder::new())
    }

    /// Watcher with a custom report parser.
    pub fn with_parser(
        config: WatchConfig,
        provider: impl DeviceProvider + 'static,
        parser: impl ReportParser + 'static,
    ) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            shared: Arc::new(Shared {
                identity: config.identity(),
                scan_interval_ms: AtomicU64::new(config.scan_interval_ms),
                read_timeout: config.read_timeout(),
                stopped: Mutex::new(false),
                wake: Condvar::new(),
                state: Mutex::new(WatchState::Idle),
            }),
            bus: ShuttleEventBus::new(),
            worker: Mutex::new(Worker::Ready {
                provider: Box::new(provider),
                parser: Box::new(parser),
            }),
        })
    }

    /// ShuttleXpress over `hidapi` with default settings.
    #[cfg(feature = "hid")]
    pub fn shuttle_xpress() -> Result<Self> {
        Self::new(
            WatchConfig::default(),
            crate::backends::hid::HidApiProvider::new()?,
        )
    }

    pub fn identity(&self) -> DeviceIdentity {
        self.shared.identity
    }

    pub fn state(&self) -> WatchState {
        *self.shared.state.lock()
    }

    pub fn is_disposed(&self) -> bool {
        self.state() == WatchState::Disposed
    }

    /// The event bus; clone it to subscribe from elsewhere.
    pub fn events(&self) -> &ShuttleEventBus {
        &self.bus
    }

    pub fn add_listener(
        &self,
        listener: impl ShuttleListener + 'static,
        filter: EventFilter,
    ) -> ListenerId {
        self.bus.add_listener(listener, filter, None)
    }

    pub fn subscribe_channel(&self, filter: EventFilter) -> (ListenerId, Receiver<ShuttleEvent>) {
        self.bus.subscribe_channel(filter)
    }

    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.bus.remove_listener(id)
    }

    pub fn scan_interval(&self) -> Duration {
        self.shared.scan_interval()
    }

    /// Change the probe interval.
    ///
    /// Takes effect at once: a pending wait ends and the next probe runs now.
    pub fn set_scan_interval(&self, interval: Duration) {
        let ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX).max(1);
        self.shared.set_scan_interval_ms(ms);
    }

    /// Start looking for the device. Calling it again while running is a no-op.
    pub fn scan_for_device(&self) -> Result<()> {
        self.start_with(|name, body| std::thread::Builder::new().name(name).spawn(body))
    }

    /// Start the worker through `spawn`. If `spawn` fails the watcher stays
    /// `Idle` and can be started again.
    fn start_with<S>(&self, spawn: S) -> Result<()>
    where
        S: FnOnce(String, Box<dyn FnOnce() + Send>) -> std::io::Result<JoinHandle<()>>,
    {
        let mut worker = self.worker.lock();
        let (provider, parser) = match std::mem::replace(&mut *worker, Worker::Finished) {
            Worker::Ready { provider, parser } => (provider, parser),
            running @ Worker::Running(_) => {
                *worker = running;
                return Ok(());
            }
            Worker::Finished => return Err(WatchError::Disposed),
        };

        // The thread takes its half out of here; on spawn failure we take it back.
        let handoff = Arc::new(Mutex::new(Some((provider, parser))));
        let body: Box<dyn FnOnce() + Send> = {
            let handoff = Arc::clone(&handoff);
            let shared = Arc::clone(&self.shared);
            let bus = self.bus.clone();
            Box::new(move || {
                let owned = handoff.lock().take();
                if let Some((provider, parser)) = owned {
                    run(shared, bus, provider, parser);
                }
            })
        };

        self.shared.set_state(WatchState::Scanning);
        match spawn(format!("shuttlewatch-{}", self.shared.identity), body) {
            Ok(handle) => {
                *worker = Worker::Running(handle);
                Ok(())
            }
            Err(e) => {
                if let Some((provider, parser)) = handoff.lock().take() {
                    *worker = Worker::Ready { provider, parser };
                }
                self.shared.set_state(WatchState::Idle);
                tracing::warn!(error = %e, "failed to start watcher thread");
                Err(WatchError::Spawn(e))
            }
        }
    }

    /// Stop scanning/reading, release the device and drop all listeners.
    pub fn dispose(&self) {
        self.shared.set_state(WatchState::Disposed);
        self.shared.request_stop();

        let worker = std::mem::replace(&mut *self.worker.lock(), Worker::Finished);
        if let Worker::Running(handle) = worker {
            if handle.thread().id() == std::thread::current().id() {
                tracing::debug!("dispose called from the watcher thread; not joining");
            } else if handle.join().is_err() {
                tracing::warn!("watcher thread panicked");
            }
        }
        self.bus.clear();
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("identity", &self.shared.identity)
            .field("state", &self.state())
            .finish()
    }
}

enum Probe {
    Opened(DeviceMeta, Box<dyn ReportSource>),
    Missing,
    Failed(WatchError),
}

fn probe(provider: &mut dyn DeviceProvider, identity: DeviceIdentity) -> Probe {
    let listed = match provider.enumerate() {
        Ok(listed) => listed,
        Err(e) => return Probe::Failed(e),
    };
    let Some(meta) = listed.into_iter().find(|m| identity.matches(m)) else {
        return Probe::Missing;
    };
    match provider.open(&meta) {
        Ok(handle) if handle.is_open() => Probe::Opened(meta, handle),
        Ok(_) => Probe::Failed(WatchError::OpenFailed {
            identity,
            reason: "handle not open after open()".into(),
        }),
        Err(e) => Probe::Failed(e),
    }
}

enum ReadEnd {
    Removed,
    Stopped,
}

fn read_until_gone(
    shared: &Shared,
    bus: &ShuttleEventBus,
    handle: &mut dyn ReportSource,
    parser: &mut dyn ReportParser,
) -> ReadEnd {
    if let Some(len) = parser.input_report_len() {
        handle.set_report_len(len);
    }
    let mut events = Vec::new();
    loop {
        if shared.is_stopped() {
            return ReadEnd::Stopped;
        }
        if !handle.is_open() {
            return ReadEnd::Removed;
        }
        match handle.read_report(shared.read_timeout) {
            Ok(Some(raw)) => {
                tracing::trace!("report {:02x?}", raw);
                let (report_id, payload) = if parser.expects_report_id_prefix() {
                    split_report_id(&raw)
                } else {
                    (0, raw.as_slice())
                };
                parser.parse(report_id, payload, &mut events);
                for event in events.drain(..) {
                    bus.emit(&event);
                }
            }
            Ok(None) => {}
            Err(e) => {
                if e.is_removal() {
                    tracing::debug!(error = %e, "read ended");
                } else {
                    tracing::warn!(error = %e, "read failed; treating device as removed");
                }
                return ReadEnd::Removed;
            }
        }
    }
}

fn run(
    shared: Arc<Shared>,
    bus: ShuttleEventBus,
    mut provider: Box<dyn DeviceProvider>,
    mut parser: Box<dyn ReportParser>,
) {
    let identity = shared.identity;
    let mut logged_missing = false;
    tracing::debug!(%identity, "watcher started");

    while !shared.is_stopped() {
        shared.set_state(WatchState::Scanning);

        match probe(provider.as_mut(), identity) {
            Probe::Opened(meta, mut handle) => {
                logged_missing = false;
                shared.set_state(WatchState::Attached);
                tracing::info!(%identity, device = %meta, "device attached");
                bus.emit(&ShuttleEvent::Attached(meta.clone()));

                let end = read_until_gone(&shared, &bus, handle.as_mut(), parser.as_mut());
                handle.close();
                drop(handle);
                parser.reset();

                match end {
                    ReadEnd::Stopped => break,
                    ReadEnd::Removed => {
                        shared.set_state(WatchState::Scanning);
                        tracing::info!(%identity, device = %meta, "device removed");
                        bus.emit(&ShuttleEvent::Removed(meta));
                    }
                }
            }
            Probe::Missing if !logged_missing => {
                logged_missing = true;
                tracing::info!(
                    %identity,
                    interval = ?shared.scan_interval(),
                    "device not connected; scanning"
                );
            }
            Probe::Missing => tracing::trace!(%identity, "device not connected"),
            Probe::Failed(e) => tracing::warn!(%identity, error = %e, "probe failed"),
        }

        if shared.wait_or_stop() {
            break;
        }
    }

    tracing::debug!(%identity, "watcher stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::virtual_input::{VirtualProvider, VirtualShuttle};
    use crate::event::{Direction, TurnEvent};
    use std::time::Instant;

    const WAIT: Duration = Duration::from_secs(2);

    fn fast_config() -> WatchConfig {
        WatchConfig::default()
            .with_scan_interval(Duration::from_millis(10))
            .with_read_timeout(Duration::from_millis(5))
    }

    fn wait_until(mut f: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + WAIT;
        while Instant::now() < deadline {
            if f() {
                return true;
            }
            std::thread::sleep(Duration::from_millis(2));
        }
        f()
    }

    #[test]
    fn invalid_config_is_rejected() {
        let cfg = WatchConfig {
            scan_interval_ms: 0,
            ..Default::default()
        };
        assert!(Watcher::new(cfg, VirtualProvider::new()).is_err());
    }

    #[test]
    fn attach_decode_and_dispose() {
        let dev = VirtualShuttle::shuttle_xpress();
        dev.plug();
        let watcher = Watcher::new(fast_config(), VirtualProvider::new().with_device(dev.clone()))
            .unwrap();
        let (_, rx) = watcher.subscribe_channel(EventFilter::All);
        assert_eq!(watcher.state(), WatchState::Idle);

        watcher.scan_for_device().unwrap();
        watcher.scan_for_device().unwrap();

        match rx.recv_timeout(WAIT).unwrap() {
            ShuttleEvent::Attached(meta) => assert_eq!(meta.path.as_deref(), Some("virtual:0")),
            other => panic!("expected Attached, got {other:?}"),
        }
        assert_eq!(watcher.state(), WatchState::Attached);

        assert!(dev.feed(&[0, 0, 0, 0, 0]));
        assert!(dev.feed(&[3, 0, 0, 0, 0]));
        assert_eq!(
            rx.recv_timeout(WAIT).unwrap(),
            ShuttleEvent::JogWheelTurned(TurnEvent::new(Direction::Right, 3))
        );

        watcher.dispose();
        watcher.dispose();
        assert_eq!(watcher.state(), WatchState::Disposed);
        assert!(!dev.is_open());
        assert!(watcher.events().is_empty());
        assert!(matches!(
            watcher.scan_for_device(),
            Err(WatchError::Disposed)
        ));
    }

    #[test]
    fn set_scan_interval_clamps_to_one_ms() {
        let watcher = Watcher::new(fast_config(), VirtualProvider::new()).unwrap();
        watcher.set_scan_interval(Duration::ZERO);
        assert_eq!(watcher.scan_interval(), Duration::from_millis(1));
        watcher.set_scan_interval(Duration::from_secs(3));
        assert_eq!(watcher.scan_interval(), Duration::from_secs(3));
    }

    #[test]
    fn lowering_the_interval_ends_a_long_wait() {
        let dev = VirtualShuttle::shuttle_xpress();
        let watcher = Watcher::new(
            fast_config().with_scan_interval(Duration::from_secs(3600)),
            VirtualProvider::new().with_device(dev.clone()),
        )
        .unwrap();
        let (_, rx) = watcher.subscribe_channel(EventFilter::DeviceOnly);
        watcher.scan_for_device().unwrap();
        assert!(wait_until(|| watcher.state() == WatchState::Scanning));
        std::thread::sleep(Duration::from_millis(50));

        dev.plug();
        assert!(rx.recv_timeout(Duration::from_millis(100)).is_err());

        watcher.set_scan_interval(Duration::from_millis(10));
        assert!(matches!(
            rx.recv_timeout(WAIT),
            Ok(ShuttleEvent::Attached(_))
        ));
    }

    #[test]
    fn failed_spawn_leaves_watcher_startable() {
        let dev = VirtualShuttle::shuttle_xpress();
        dev.plug();
        let watcher = Watcher::new(fast_config(), VirtualProvider::new().with_device(dev.clone()))
            .unwrap();
        let (_, rx) = watcher.subscribe_channel(EventFilter::All);

        let err = watcher
            .start_with(|_, _| Err(std::io::Error::other("no threads left")))
            .unwrap_err();
        assert!(matches!(err, WatchError::Spawn(_)));
        assert_eq!(watcher.state(), WatchState::Idle);
        assert_eq!(dev.opens(), 0);

        watcher.scan_for_device().unwrap();
        assert!(matches!(
            rx.recv_timeout(WAIT),
            Ok(ShuttleEvent::Attached(_))
        ));
        assert_eq!(watcher.state(), WatchState::Attached);
    }

    #[test]
    fn decoder_report_len_reaches_the_handle() {
        let dev = VirtualShuttle::shuttle_xpress();
        dev.plug();
        let watcher = Watcher::new(fast_config(), VirtualProvider::new().with_device(dev.clone()))
            .unwrap();
        watcher.scan_for_device().unwrap();
        assert!(wait_until(|| dev.report_len() == Some(crate::shuttle::REPORT_LEN)));
    }

    #[test]
    fn dispose_wakes_a_long_scan_wait() {
        let watcher = Watcher::new(
            WatchConfig::default().with_scan_interval(Duration::from_secs(3600)),
            VirtualProvider::new(),
        )
        .unwrap();
        watcher.scan_for_device().unwrap();
        assert!(wait_until(|| watcher.state() == WatchState::Scanning));

        let started = Instant::now();
        watcher.dispose();
        assert!(started.elapsed() < WAIT);
    }

    #[test]
    fn dispose_without_start_is_fine() {
        let watcher = Watcher::new(fast_config(), VirtualProvider::new()).unwrap();
        watcher.dispose();
        assert!(watcher.is_disposed());
    }
}
