use crate::event::ShuttleEvent;
use crate::eventbus::ShuttleListener;

/// Wraps a listener and filters events based on a user-supplied predicate.
///
/// Useful when [`EventFilter`](crate::eventbus::EventFilter) is too coarse,
/// e.g. to only pass jog turns larger than some threshold to a slow consumer.
pub struct FilteredListener {
    predicate: Box<dyn Fn(&ShuttleEvent) -> bool + Send + Sync>,
    inner: Box<dyn ShuttleListener>,
}

impl FilteredListener {
    pub fn new(
        predicate: impl Fn(&ShuttleEvent) -> bool + Send + Sync + 'static,
        inner: impl ShuttleListener + 'static,
    ) -> Self {
        Self {
            predicate: Box::new(predicate),
            inner: Box::new(inner),
        }
    }
}

impl ShuttleListener for FilteredListener {
    fn on_event(&mut self, event: &ShuttleEvent) {
        if (self.predicate)(event) {
            self.inner.on_event(event);
        }
    }
}
