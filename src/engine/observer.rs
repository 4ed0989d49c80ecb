//! Publish/subscribe registry for external observers.

use std::collections::BTreeMap;

use super::event::{Event, EventType};

/// Callback invoked with every dispatched event of its kind.
pub type ObserverFn = Box<dyn FnMut(&Event)>;

/// Event kind → callbacks in registration order.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: BTreeMap<EventType, Vec<ObserverFn>>,
}

impl ObserverRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback for one event kind.
    pub fn subscribe(&mut self, event_type: EventType, observer: ObserverFn) {
        self.observers.entry(event_type).or_default().push(observer);
    }

    /// Invokes every callback registered for the event's kind.
    pub fn publish(&mut self, event: &Event) {
        if let Some(observers) = self.observers.get_mut(&event.event_type()) {
            for observer in observers.iter_mut() {
                observer(event);
            }
        }
    }

    /// Number of callbacks registered for a kind.
    pub fn count(&self, event_type: EventType) -> usize {
        self.observers.get(&event_type).map_or(0, Vec::len)
    }

    /// Whether no callback is registered.
    pub fn is_empty(&self) -> bool {
        self.observers.values().all(Vec::is_empty)
    }
}

impl std::fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.observers.iter().map(|(k, v)| (k, v.len())))
            .finish()
    }
}
