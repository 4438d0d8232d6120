use crate::event::ShuttleEvent;
use crate::eventbus::ShuttleListener;

/// A simple listener that logs all events through `tracing`.
///
/// Lifecycle events are logged at `info`, input at `debug`.
#[derive(Debug, Default)]
pub struct TracingLogger;

impl TracingLogger {
    pub fn new() -> Self {
        TracingLogger
    }
}

impl ShuttleListener for TracingLogger {
    fn on_event(&mut self, event: &ShuttleEvent) {
        match event {
            ShuttleEvent::Attached(meta) => tracing::info!(device = %meta, "shuttle attached"),
            ShuttleEvent::Removed(meta) => tracing::info!(device = %meta, "shuttle removed"),
            ShuttleEvent::JogWheelTurned(t) => {
                tracing::debug!(direction = ?t.direction, amount = t.amount, "jog wheel")
            }
            ShuttleEvent::InnerWheelTurned(t) => {
                tracing::debug!(direction = ?t.direction, amount = t.amount, "inner wheel")
            }
            ShuttleEvent::ButtonPressed(b) => tracing::debug!(button = %b, "button pressed"),
        }
    }
}
