//! Publish/subscribe registry keyed by [`EventKind`].

use deckbridge_core::{EventKind, InboundEvent};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Callback invoked for every matching inbound event.
pub type Listener = Arc<dyn Fn(&InboundEvent) + Send + Sync>;

/// Handle returned by a subscription, used to remove it again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

struct Entry {
    id: ListenerId,
    once: bool,
    callback: Listener,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    by_kind: HashMap<EventKind, Vec<Entry>>,
}

/// Ordered listener lists per event kind.
///
/// Dispatch snapshots the list before invoking anything, so a listener may
/// subscribe or unsubscribe (itself included) while it runs. Changes apply
/// from the next event on.
#[derive(Default)]
pub(crate) struct Listeners {
    registry: Mutex<Registry>,
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let registry = self.lock();
        f.debug_struct("Listeners")
            .field("kinds", &registry.by_kind.len())
            .field(
                "total",
                &registry.by_kind.values().map(Vec::len).sum::<usize>(),
            )
            .field("next_id", &registry.next_id)
            .finish()
    }
}

impl Listeners {
    fn lock(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.registry.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn add(&self, kind: EventKind, callback: Listener, once: bool) -> ListenerId {
        let mut registry = self.lock();
        let id = ListenerId(registry.next_id);
        registry.next_id += 1;
        registry.by_kind.entry(kind).or_default().push(Entry {
            id,
            once,
            callback,
        });
        tracing::trace!(event = %kind, ?id, once, "listener added");
        id
    }

    /// Safe to call with an id that is already gone.
    pub(crate) fn remove(&self, kind: EventKind, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let Some(entries) = registry.by_kind.get_mut(&kind) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|e| e.id != id);
        before != entries.len()
    }

    /// Drop every listener for `kind`, or every listener at all.
    pub(crate) fn remove_all(&self, kind: Option<EventKind>) {
        let mut registry = self.lock();
        match kind {
            Some(kind) => {
                registry.by_kind.remove(&kind);
            }
            None => registry.by_kind.clear(),
        }
    }

    pub(crate) fn count(&self, kind: EventKind) -> usize {
        self.lock().by_kind.get(&kind).map_or(0, Vec::len)
    }

    /// Invoke every listener for the event's kind, in subscription order.
    /// Returns how many were invoked.
    pub(crate) fn notify(&self, event: &InboundEvent) -> usize {
        let snapshot: Vec<Listener> = {
            let mut registry = self.lock();
            let Some(entries) = registry.by_kind.get_mut(&event.kind()) else {
                return 0;
            };
            let snapshot = entries.iter().map(|e| Arc::clone(&e.callback)).collect();
            entries.retain(|e| !e.once);
            snapshot
        };

        for callback in &snapshot {
            callback(event);
        }
        snapshot.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn wake_up() -> InboundEvent {
        InboundEvent::SystemDidWakeUp {}
    }

    fn recorder(log: &Arc<Mutex<Vec<&'static str>>>, name: &'static str) -> Listener {
        let log = Arc::clone(log);
        Arc::new(move |_: &InboundEvent| log.lock().unwrap().push(name))
    }

    #[test]
    fn fires_in_subscription_order() {
        let listeners = Listeners::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        listeners.add(EventKind::SystemDidWakeUp, recorder(&log, "a"), false);
        listeners.add(EventKind::SystemDidWakeUp, recorder(&log, "b"), false);
        listeners.add(EventKind::KeyDown, recorder(&log, "other"), false);

        assert_eq!(listeners.notify(&wake_up()), 2);
        assert_eq!(listeners.notify(&wake_up()), 2);
        assert_eq!(*log.lock().unwrap(), vec!["a", "b", "a", "b"]);
    }

    #[test]
    fn once_fires_a_single_time() {
        let listeners = Listeners::default();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        listeners.add(
            EventKind::SystemDidWakeUp,
            Arc::new(move |_: &InboundEvent| {
                h.fetch_add(1, Ordering::SeqCst);
            }),
            true,
        );

        listeners.notify(&wake_up());
        listeners.notify(&wake_up());
        assert_eq!(hits.load(Ordering::SeqCst), 1);
        assert_eq!(listeners.count(EventKind::SystemDidWakeUp), 0);
    }

    #[test]
    fn remove_by_id() {
        let listeners = Listeners::default();
        let log = Arc::new(Mutex::new(Vec::new()));
        let a = listeners.add(EventKind::SystemDidWakeUp, recorder(&log, "a"), false);
        listeners.add(EventKind::SystemDidWakeUp, recorder(&log, "b"), false);

        assert!(listeners.remove(EventKind::SystemDidWakeUp, a));
        assert!(!listeners.remove(EventKind::SystemDidWakeUp, a));
        assert!(!listeners.remove(EventKind::KeyUp, a));
        listeners.notify(&wake_up());
        assert_eq!(*log.lock().unwrap(), vec!["b"]);

        listeners.remove_all(Some(EventKind::SystemDidWakeUp));
        assert_eq!(listeners.notify(&wake_up()), 0);
    }

    #[test]
    fn listener_may_unsubscribe_during_dispatch() {
        let listeners = Arc::new(Listeners::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim = Arc::new(Mutex::new(None));

        let registry = Arc::clone(&listeners);
        let target = Arc::clone(&victim);
        let l = Arc::clone(&log);
        listeners.add(
            EventKind::SystemDidWakeUp,
            Arc::new(move |_: &InboundEvent| {
                l.lock().unwrap().push("remover");
                if let Some(id) = target.lock().unwrap().take() {
                    registry.remove(EventKind::SystemDidWakeUp, id);
                }
            }),
            false,
        );
        let id = listeners.add(EventKind::SystemDidWakeUp, recorder(&log, "victim"), false);
        *victim.lock().unwrap() = Some(id);

        // The in-flight delivery still reaches the victim; the next does not.
        listeners.notify(&wake_up());
        listeners.notify(&wake_up());
        assert_eq!(
            *log.lock().unwrap(),
            vec!["remover", "victim", "remover"]
        );
    }

    #[test]
    fn listener_may_subscribe_during_dispatch() {
        let listeners = Arc::new(Listeners::default());
        let hits = Arc::new(AtomicUsize::new(0));
        let registry = Arc::clone(&listeners);
        let h = Arc::clone(&hits);
        listeners.add(
            EventKind::SystemDidWakeUp,
            Arc::new(move |_: &InboundEvent| {
                let h = Arc::clone(&h);
                registry.add(
                    EventKind::SystemDidWakeUp,
                    Arc::new(move |_: &InboundEvent| {
                        h.fetch_add(1, Ordering::SeqCst);
                    }),
                    false,
                );
            }),
            true,
        );

        assert_eq!(listeners.notify(&wake_up()), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        assert_eq!(listeners.notify(&wake_up()), 1);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
