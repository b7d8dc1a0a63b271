//! In-process publish/subscribe for per-connection events.
//!
//! Subscribers register a callback for one connection and get back a
//! [`Subscription`]; the callback stays registered until the handle is
//! dropped or [`Subscription::unsubscribe`] is called.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use serde::{Deserialize, Serialize};

use crate::connection::InteractionKind;
use crate::streak::Transition;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConnectionEvent {
    InteractionRecorded {
        connection_id: String,
        user_id: String,
        kind: InteractionKind,
        transition: Transition,
        current_streak_days: u32,
    },
    StreakReset {
        connection_id: String,
        longest_streak_days: u32,
    },
    ReminderDue {
        connection_id: String,
        current_streak_days: u32,
    },
    Disconnected {
        connection_id: String,
        by_user_id: String,
    },
}

impl ConnectionEvent {
    /// The serde tag, e.g. `"streak_reset"`.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InteractionRecorded { .. } => "interaction_recorded",
            Self::StreakReset { .. } => "streak_reset",
            Self::ReminderDue { .. } => "reminder_due",
            Self::Disconnected { .. } => "disconnected",
        }
    }

    pub fn connection_id(&self) -> &str {
        match self {
            Self::InteractionRecorded { connection_id, .. }
            | Self::StreakReset { connection_id, .. }
            | Self::ReminderDue { connection_id, .. }
            | Self::Disconnected { connection_id, .. } => connection_id,
        }
    }
}

type Callback = Arc<dyn Fn(&ConnectionEvent) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_connection: HashMap<String, Vec<(u64, Callback)>>,
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Cheap to clone; all clones share the same subscriber registry.
#[derive(Clone, Default)]
pub struct EventHub {
    registry: Arc<Mutex<Registry>>,
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe<F>(&self, connection_id: &str, on_event: F) -> Subscription
    where
        F: Fn(&ConnectionEvent) + Send + Sync + 'static,
    {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry
            .by_connection
            .entry(connection_id.to_string())
            .or_default()
            .push((id, Arc::new(on_event)));
        Subscription {
            registry: Arc::downgrade(&self.registry),
            connection_id: connection_id.to_string(),
            id,
        }
    }

    /// Deliver `event` to every subscriber of its connection. Returns the
    /// number of callbacks invoked.
    ///
    /// Callbacks run after the registry lock is released, so they may
    /// subscribe or unsubscribe themselves.
    pub fn publish(&self, event: &ConnectionEvent) -> usize {
        let callbacks: Vec<Callback> = lock(&self.registry)
            .by_connection
            .get(event.connection_id())
            .map(|subs| subs.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default();
        for callback in &callbacks {
            callback(event);
        }
        callbacks.len()
    }

    pub fn subscriber_count(&self, connection_id: &str) -> usize {
        lock(&self.registry)
            .by_connection
            .get(connection_id)
            .map_or(0, Vec::len)
    }
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = lock(&self.registry);
        f.debug_struct("EventHub")
            .field("connections", &registry.by_connection.len())
            .finish()
    }
}

/// Handle returned by [`EventHub::subscribe`].
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    registry: Weak<Mutex<Registry>>,
    connection_id: String,
    id: u64,
}

impl Subscription {
    pub fn connection_id(&self) -> &str {
        &self.connection_id
    }

    pub fn unsubscribe(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(registry) = self.registry.upgrade() else {
            return;
        };
        let mut registry = lock(&registry);
        if let Some(subs) = registry.by_connection.get_mut(&self.connection_id) {
            subs.retain(|(id, _)| *id != self.id);
            if subs.is_empty() {
                registry.by_connection.remove(&self.connection_id);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn reset(connection_id: &str) -> ConnectionEvent {
        ConnectionEvent::StreakReset {
            connection_id: connection_id.into(),
            longest_streak_days: 4,
        }
    }

    #[test]
    fn delivers_only_to_matching_connection() {
        let hub = EventHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let _sub = hub.subscribe("c1", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        assert_eq!(hub.publish(&reset("c1")), 1);
        assert_eq!(hub.publish(&reset("c2")), 0);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn unsubscribe_stops_delivery() {
        let hub = EventHub::new();
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let sub = hub.subscribe("c1", move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        let _other = hub.subscribe("c1", |_| {});
        assert_eq!(hub.subscriber_count("c1"), 2);

        sub.unsubscribe();
        assert_eq!(hub.subscriber_count("c1"), 1);
        hub.publish(&reset("c1"));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn dropping_last_handle_clears_connection_entry() {
        let hub = EventHub::new();
        {
            let _sub = hub.subscribe("c1", |_| {});
            assert_eq!(hub.subscriber_count("c1"), 1);
        }
        assert_eq!(hub.subscriber_count("c1"), 0);
        assert_eq!(hub.publish(&reset("c1")), 0);
    }

    #[test]
    fn handle_outliving_hub_is_harmless() {
        let hub = EventHub::new();
        let sub = hub.subscribe("c1", |_| {});
        drop(hub);
        drop(sub);
    }

    #[test]
    fn callback_may_resubscribe_without_deadlock() {
        let hub = EventHub::new();
        let inner = hub.clone();
        let slot: Arc<Mutex<Vec<Subscription>>> = Arc::default();
        let keep = Arc::clone(&slot);
        let _sub = hub.subscribe("c1", move |_| {
            let sub = inner.subscribe("c1", |_| {});
            keep.lock().unwrap().push(sub);
        });
        hub.publish(&reset("c1"));
        assert_eq!(hub.subscriber_count("c1"), 2);
    }

    #[test]
    fn event_serializes_with_type_tag() {
        let json = serde_json::to_value(reset("c9")).unwrap();
        assert_eq!(json["type"], "streak_reset");
        assert_eq!(json["connection_id"], "c9");
        assert_eq!(json["type"], reset("c9").kind());
    }
}
