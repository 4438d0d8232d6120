//! Listener registry and dispatch.
//!
//! [`ShuttleEventBus`] is a cheaply cloneable handle; the watcher keeps one
//! clone and emits on its worker thread, the application keeps another to
//! subscribe and unsubscribe at any time.
//!
//! Dispatch is synchronous and in order. The registry lock is released before
//! any listener runs, so a listener may add or remove listeners (including
//! itself) from inside its callback. Listeners that touch UI state are
//! responsible for marshalling to their own thread.

use crate::event::{Button, ShuttleEvent, TurnEvent};
use crate::metadata::DeviceMeta;
use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Receives events from a watcher.
///
/// Override only the callbacks you care about; the rest are no-ops. Overriding
/// [`on_event`](ShuttleListener::on_event) replaces the per-kind routing.
pub trait ShuttleListener: Send {
    fn on_attached(&mut self, _device: &DeviceMeta) {}
    fn on_removed(&mut self, _device: &DeviceMeta) {}
    fn on_jog_turned(&mut self, _turn: TurnEvent) {}
    fn on_inner_turned(&mut self, _turn: TurnEvent) {}
    fn on_button_pressed(&mut self, _button: Button) {}

    fn on_event(&mut self, event: &ShuttleEvent) {
        match event {
            ShuttleEvent::Attached(meta) => self.on_attached(meta),
            ShuttleEvent::Removed(meta) => self.on_removed(meta),
            ShuttleEvent::JogWheelTurned(turn) => self.on_jog_turned(*turn),
            ShuttleEvent::InnerWheelTurned(turn) => self.on_inner_turned(*turn),
            ShuttleEvent::ButtonPressed(button) => self.on_button_pressed(*button),
        }
    }
}

impl<F> ShuttleListener for F
where
    F: FnMut(&ShuttleEvent) + Send,
{
    fn on_event(&mut self, event: &ShuttleEvent) {
        self(event)
    }
}

/// Determines which kinds of events a listener wants to receive.
#[derive(Debug, Clone, Copy)]
pub enum EventFilter {
    All,
    /// `Attached` / `Removed` only.
    DeviceOnly,
    /// Jog ring and inner wheel only.
    WheelsOnly,
    ButtonsOnly,
    Custom(fn(&ShuttleEvent) -> bool),
}

impl EventFilter {
    pub fn accepts(&self, event: &ShuttleEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::DeviceOnly => event.is_device(),
            EventFilter::WheelsOnly => event.is_wheel(),
            EventFilter::ButtonsOnly => event.is_button(),
            EventFilter::Custom(f) => f(event),
        }
    }
}

/// Handle returned on registration; pass it back to remove or mute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

type SharedListener = Arc<Mutex<Box<dyn ShuttleListener>>>;

#[derive(Clone)]
enum Sink {
    Callback(SharedListener),
    Channel(Sender<ShuttleEvent>),
}

/// Metadata-wrapped listener with filters and control flags.
struct ListenerEntry {
    sink: Sink,
    enabled: bool,
    filter: EventFilter,
    /// Device path; lifecycle events for other paths are skipped.
    tag: Option<String>,
}

impl ListenerEntry {
    fn wants(&self, event: &ShuttleEvent) -> bool {
        if !self.enabled || !self.filter.accepts(event) {
            return false;
        }
        match (&self.tag, event.device()) {
            (Some(wanted), Some(meta)) => meta.path.as_deref() == Some(wanted.as_str()),
            _ => true,
        }
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: BTreeMap<ListenerId, ListenerEntry>,
}

#[derive(Clone, Default)]
pub struct ShuttleEventBus {
    inner: Arc<Mutex<Registry>>,
}

impl std::fmt::Debug for ShuttleEventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShuttleEventBus")
            .field("listeners", &self.len())
            .finish()
    }
}

impl ShuttleEventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn register(&self, sink: Sink, filter: EventFilter, tag: Option<String>) -> ListenerId {
        let mut reg = self.inner.lock();
        let id = ListenerId(reg.next_id);
        reg.next_id += 1;
        reg.listeners.insert(
            id,
            ListenerEntry {
                sink,
                enabled: true,
                filter,
                tag,
            },
        );
        id
    }

    /// Registers a listener with optional filtering and device-path tag.
    pub fn add_listener(
        &self,
        listener: impl ShuttleListener + 'static,
        filter: EventFilter,
        tag: Option<String>,
    ) -> ListenerId {
        let boxed: Box<dyn ShuttleListener> = Box::new(listener);
        self.register(Sink::Callback(Arc::new(Mutex::new(boxed))), filter, tag)
    }

    /// Registers an unbounded channel subscriber.
    ///
    /// Dropping the receiver unsubscribes it on the next emit.
    pub fn subscribe_channel(&self, filter: EventFilter) -> (ListenerId, Receiver<ShuttleEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        let id = self.register(Sink::Channel(tx), filter, None);
        (id, rx)
    }

    /// Enables a previously registered listener.
    pub fn enable(&self, id: ListenerId) {
        if let Some(entry) = self.inner.lock().listeners.get_mut(&id) {
            entry.enabled = true;
        }
    }

    /// Disables (mutes) a listener without removing it.
    pub fn disable(&self, id: ListenerId) {
        if let Some(entry) = self.inner.lock().listeners.get_mut(&id) {
            entry.enabled = false;
        }
    }

    /// Unregisters a listener entirely. Returns whether it was registered.
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        self.inner.lock().listeners.remove(&id).is_some()
    }

    /// Drops every listener.
    pub fn clear(&self) {
        self.inner.lock().listeners.clear();
    }

    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Emits one event to all active and matching listeners, in registration order.
    pub fn emit(&self, event: &ShuttleEvent) {
        let targets: Vec<(ListenerId, Sink)> = {
            let reg = self.inner.lock();
            reg.listeners
                .iter()
                .filter(|(_, entry)| entry.wants(event))
                .map(|(id, entry)| (*id, entry.sink.clone()))
                .collect()
        };

        let mut dead = Vec::new();
        for (id, sink) in targets {
            match sink {
                Sink::Callback(listener) => listener.lock().on_event(event),
                Sink::Channel(tx) => {
                    if tx.send(event.clone()).is_err() {
                        dead.push(id);
                    }
                }
            }
        }

        if !dead.is_empty() {
            let mut reg = self.inner.lock();
            for id in dead {
                tracing::debug!(?id, "dropping disconnected channel subscriber");
                reg.listeners.remove(&id);
            }
        }
    }

    /// Emits a batch of events to matching listeners.
    pub fn emit_all(&self, events: &[ShuttleEvent]) {
        for event in events {
            self.emit(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::Direction;

    fn jog(n: i32) -> ShuttleEvent {
        ShuttleEvent::JogWheelTurned(TurnEvent::new(Direction::Right, n))
    }

    fn attached(path: &str) -> ShuttleEvent {
        ShuttleEvent::Attached(DeviceMeta {
            path: Some(path.into()),
            ..Default::default()
        })
    }

    fn recorder() -> (Arc<Mutex<Vec<ShuttleEvent>>>, impl ShuttleListener + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        (seen, move |e: &ShuttleEvent| sink.lock().push(e.clone()))
    }

    #[test]
    fn closures_receive_in_order() {
        let bus = ShuttleEventBus::new();
        let (seen, listener) = recorder();
        bus.add_listener(listener, EventFilter::All, None);

        bus.emit_all(&[jog(1), jog(2), ShuttleEvent::ButtonPressed(Button::Button2)]);
        assert_eq!(
            *seen.lock(),
            vec![jog(1), jog(2), ShuttleEvent::ButtonPressed(Button::Button2)]
        );
    }

    #[test]
    fn filters_and_muting() {
        let bus = ShuttleEventBus::new();
        let (buttons, listener) = recorder();
        let id = bus.add_listener(listener, EventFilter::ButtonsOnly, None);

        bus.emit(&jog(1));
        bus.emit(&ShuttleEvent::ButtonPressed(Button::Button1));
        bus.disable(id);
        bus.emit(&ShuttleEvent::ButtonPressed(Button::Button2));
        bus.enable(id);
        bus.emit(&ShuttleEvent::ButtonPressed(Button::Button3));

        assert_eq!(
            *buttons.lock(),
            vec![
                ShuttleEvent::ButtonPressed(Button::Button1),
                ShuttleEvent::ButtonPressed(Button::Button3)
            ]
        );
    }

    #[test]
    fn custom_filter() {
        fn big_turns(e: &ShuttleEvent) -> bool {
            matches!(e, ShuttleEvent::JogWheelTurned(t) if t.magnitude() >= 5)
        }
        let bus = ShuttleEventBus::new();
        let (seen, listener) = recorder();
        bus.add_listener(listener, EventFilter::Custom(big_turns), None);
        bus.emit_all(&[jog(1), jog(6)]);
        assert_eq!(*seen.lock(), vec![jog(6)]);
    }

    #[test]
    fn tag_limits_lifecycle_events() {
        let bus = ShuttleEventBus::new();
        let (seen, listener) = recorder();
        bus.add_listener(listener, EventFilter::All, Some("hid#1".into()));
        bus.emit_all(&[attached("hid#2"), attached("hid#1"), jog(3)]);
        assert_eq!(*seen.lock(), vec![attached("hid#1"), jog(3)]);
    }

    #[test]
    fn trait_callbacks_route_by_kind() {
        #[derive(Default)]
        struct Counts {
            attached: usize,
            inner: i32,
            buttons: Vec<Button>,
        }
        struct Probe(Arc<Mutex<Counts>>);
        impl ShuttleListener for Probe {
            fn on_attached(&mut self, _device: &DeviceMeta) {
                self.0.lock().attached += 1;
            }
            fn on_inner_turned(&mut self, turn: TurnEvent) {
                self.0.lock().inner += turn.amount;
            }
            fn on_button_pressed(&mut self, button: Button) {
                self.0.lock().buttons.push(button);
            }
        }

        let counts = Arc::new(Mutex::new(Counts::default()));
        let bus = ShuttleEventBus::new();
        bus.add_listener(Probe(Arc::clone(&counts)), EventFilter::All, None);
        bus.emit_all(&[
            attached("a"),
            ShuttleEvent::InnerWheelTurned(TurnEvent::new(Direction::Left, -3)),
            ShuttleEvent::InnerWheelTurned(TurnEvent::new(Direction::Right, 1)),
            ShuttleEvent::ButtonPressed(Button::Button5),
            jog(2),
        ]);

        let c = counts.lock();
        assert_eq!(c.attached, 1);
        assert_eq!(c.inner, -2);
        assert_eq!(c.buttons, vec![Button::Button5]);
    }

    #[test]
    fn listener_can_unsubscribe_itself() {
        let bus = ShuttleEventBus::new();
        let calls = Arc::new(Mutex::new(0));
        let slot: Arc<Mutex<Option<ListenerId>>> = Arc::new(Mutex::new(None));

        let inner_bus = bus.clone();
        let inner_calls = Arc::clone(&calls);
        let inner_slot = Arc::clone(&slot);
        let id = bus.add_listener(
            move |_: &ShuttleEvent| {
                *inner_calls.lock() += 1;
                if let Some(id) = *inner_slot.lock() {
                    inner_bus.remove_listener(id);
                }
            },
            EventFilter::All,
            None,
        );
        *slot.lock() = Some(id);

        bus.emit(&jog(1));
        bus.emit(&jog(2));
        assert_eq!(*calls.lock(), 1);
        assert!(bus.is_empty());
    }

    #[test]
    fn channel_subscribers_and_pruning() {
        let bus = ShuttleEventBus::new();
        let (_keep, rx) = bus.subscribe_channel(EventFilter::WheelsOnly);
        let (_gone, dropped) = bus.subscribe_channel(EventFilter::All);
        drop(dropped);
        assert_eq!(bus.len(), 2);

        bus.emit(&jog(4));
        bus.emit(&ShuttleEvent::ButtonPressed(Button::Button1));

        assert_eq!(rx.try_recv().ok(), Some(jog(4)));
        assert!(rx.try_recv().is_err());
        assert_eq!(bus.len(), 1);
    }

    #[test]
    fn remove_unknown_is_false() {
        let bus = ShuttleEventBus::new();
        let (id, _rx) = bus.subscribe_channel(EventFilter::All);
        assert!(bus.remove_listener(id));
        assert!(!bus.remove_listener(id));
    }
}
