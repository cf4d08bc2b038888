//! Subscriber registry for state-change notifications.
//!
//! Listeners run synchronously on the notifying call. Notification iterates
//! over a snapshot of the listener set, so a listener unsubscribing itself
//! (or subscribing another) mid-delivery cannot invalidate the iteration.
//! A panicking listener is contained and the remaining listeners still run.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use tracing::warn;

use super::state::AuthState;

pub(crate) type Listener = Box<dyn Fn(&AuthState) + Send + Sync + 'static>;

#[derive(Default)]
pub(crate) struct SubscriberRegistry {
    inner: Mutex<RegistryInner>,
}

#[derive(Default)]
struct RegistryInner {
    next_id: u64,
    listeners: HashMap<u64, Arc<Listener>>,
}

impl SubscriberRegistry {
    /// Register a listener and replay the current snapshot to it, before any
    /// future transition is delivered.
    pub fn subscribe(self: &Arc<Self>, listener: Listener, current: &AuthState) -> Subscription {
        let listener = Arc::new(listener);
        let id = {
            let mut inner = self.inner.lock();
            let id = inner.next_id;
            inner.next_id += 1;
            inner.listeners.insert(id, listener.clone());
            id
        };

        Self::invoke(&listener, current);

        Subscription {
            id,
            registry: Arc::downgrade(self),
        }
    }

    pub fn notify(&self, state: &AuthState) {
        let snapshot: Vec<Arc<Listener>> = self.inner.lock().listeners.values().cloned().collect();
        for listener in snapshot {
            Self::invoke(&listener, state);
        }
    }

    fn invoke(listener: &Arc<Listener>, state: &AuthState) {
        if catch_unwind(AssertUnwindSafe(|| listener(state))).is_err() {
            warn!("auth state listener panicked");
        }
    }

    fn remove(&self, id: u64) {
        self.inner.lock().listeners.remove(&id);
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.inner.lock().listeners.len()
    }
}

/// Capability to stop receiving notifications.
pub struct Subscription {
    id: u64,
    registry: Weak<SubscriberRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting_listener(count: Arc<AtomicUsize>) -> Listener {
        Box::new(move |_state| {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_replay_on_subscribe() {
        let registry = Arc::new(SubscriberRegistry::default());
        let count = Arc::new(AtomicUsize::new(0));

        let _sub = registry.subscribe(counting_listener(count.clone()), &AuthState::loading());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribed_listener_is_silent() {
        let registry = Arc::new(SubscriberRegistry::default());
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));

        let sub_first = registry.subscribe(counting_listener(first.clone()), &AuthState::loading());
        let _sub_second =
            registry.subscribe(counting_listener(second.clone()), &AuthState::loading());

        sub_first.unsubscribe();
        registry.notify(&AuthState::unauthenticated(None));

        // The replay was the only delivery the first listener ever saw
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_panicking_listener_does_not_block_others() {
        let registry = Arc::new(SubscriberRegistry::default());
        let count = Arc::new(AtomicUsize::new(0));

        let _panicky = registry.subscribe(
            Box::new(|_state| panic!("listener bug")),
            &AuthState::loading(),
        );
        let _sub = registry.subscribe(counting_listener(count.clone()), &AuthState::loading());

        registry.notify(&AuthState::unauthenticated(None));
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_self_unsubscribe_during_notification() {
        let registry = Arc::new(SubscriberRegistry::default());
        let count = Arc::new(AtomicUsize::new(0));

        // A listener that unsubscribes itself on first delivery after replay
        let slot: Arc<Mutex<Option<Subscription>>> = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let count_clone = count.clone();
        let sub = registry.subscribe(
            Box::new(move |_state| {
                count_clone.fetch_add(1, Ordering::SeqCst);
                if let Some(sub) = slot_clone.lock().take() {
                    sub.unsubscribe();
                }
            }),
            &AuthState::loading(),
        );
        *slot.lock() = Some(sub);

        registry.notify(&AuthState::unauthenticated(None));
        registry.notify(&AuthState::unauthenticated(None));

        // Replay plus the notification it unsubscribed during
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert_eq!(registry.len(), 0);
    }
}
