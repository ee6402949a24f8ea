//! Synchronous publish/subscribe bus for lifecycle and message events.
//!
//! Channels and the connection supervisor announce everything that happens -
//! opens, closes, application events, application-level errors - through one
//! [`EventBus`] owned by the connection. Event names are namespaced as
//! `<prefix><channel>.<suffix>` with suffix one of `open`, `close`, `error`,
//! or the application-chosen event name.

use serde_json::Value;
use tracing::trace;

/// Type alias for event listener callbacks.
///
/// Called with the fully qualified event name and the event payload.
/// Lifecycle events (`open`, `close`) carry [`Value::Null`].
pub type Listener = Box<dyn FnMut(&str, &Value)>;

/// Deregistration handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct Subscriber {
    id: SubscriptionId,
    event: String,
    listener: Listener,
}

/// Publish/subscribe facility with synchronous, subscription-order delivery.
///
/// Not thread-safe by design: the whole crate runs in a single cooperative
/// dispatch context, so listeners fire inline during `publish`.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Subscriber>,
    next_id: u64,
}

impl EventBus {
    /// Creates a new empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attaches a listener to the fully qualified event name.
    ///
    /// Returns a handle for [`Self::unsubscribe`].
    pub fn subscribe(&mut self, event: impl Into<String>, listener: Listener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id);
        self.next_id += 1;
        let event = event.into();
        trace!(%event, ?id, "Attaching listener");
        self.subscribers.push(Subscriber {
            id,
            event,
            listener,
        });
        id
    }

    /// Detaches a listener. Returns false if the handle was already removed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.subscribers.len();
        self.subscribers.retain(|sub| sub.id != id);
        before != self.subscribers.len()
    }

    /// Delivers `payload` to every listener of `event`, synchronously, in
    /// subscription order.
    pub fn publish(&mut self, event: &str, payload: &Value) {
        trace!(event, "Publishing event");
        for sub in self.subscribers.iter_mut() {
            if sub.event == event {
                (sub.listener)(event, payload);
            }
        }
    }

    /// Number of currently attached listeners, across all events.
    pub fn len(&self) -> usize {
        self.subscribers.len()
    }

    /// True if no listeners are attached.
    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
