use std::collections::{hash_map::Entry, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::sink::{SinkId, Subscriber};

/// The authoritative set of live subscribers.
///
/// All access goes through `add` / `remove` / `for_each` (or `snapshot`).
/// The lock is only held to mutate the map or copy it; it is never held
/// while a sink is written to.
#[derive(Default)]
pub struct SubscriberRegistry {
    subscribers: Mutex<HashMap<SinkId, Arc<Subscriber>>>,
}

impl SubscriberRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a subscriber.
    ///
    /// Returns `false` without changing membership when the id is already
    /// present or the subscriber was closed earlier.
    pub fn add(&self, subscriber: Arc<Subscriber>) -> bool {
        let mut map = self.lock();
        if subscriber.is_closed() {
            return false;
        }
        match map.entry(subscriber.id()) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                debug!(sink_id = %subscriber.id(), "subscriber registered");
                slot.insert(subscriber);
                true
            }
        }
    }

    /// Deregister a subscriber and mark it closed.
    ///
    /// Returns the removed entry, or `None` when it was not registered
    /// (already removed by a failed write or a disconnect).
    pub fn remove(&self, id: SinkId) -> Option<Arc<Subscriber>> {
        let removed = self.lock().remove(&id);
        if let Some(ref sub) = removed {
            sub.mark_closed();
            debug!(sink_id = %id, "subscriber deregistered");
        }
        removed
    }

    /// Visit every subscriber in a snapshot of the current membership.
    ///
    /// Members added while `visit` runs are not visited; members removed
    /// while it runs are still visited but report `is_closed()`.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&Arc<Subscriber>),
    {
        for sub in self.snapshot() {
            visit(&sub);
        }
    }

    /// Copy of the current membership.
    pub fn snapshot(&self) -> Vec<Arc<Subscriber>> {
        self.lock().values().cloned().collect()
    }

    pub fn contains(&self, id: SinkId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SinkId, Arc<Subscriber>>> {
        // map operations cannot leave the HashMap half-updated
        self.subscribers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{error::Result, sink::Sink};
    use async_trait::async_trait;
    use std::collections::HashSet;

    struct NullSink;

    #[async_trait]
    impl Sink for NullSink {
        async fn send(&self, _payload: &str) -> Result<()> {
            Ok(())
        }
    }

    fn subscriber() -> Arc<Subscriber> {
        Arc::new(Subscriber::new(NullSink))
    }

    #[test]
    fn add_is_idempotent() {
        let reg = SubscriberRegistry::new();
        let sub = subscriber();
        assert!(reg.add(Arc::clone(&sub)));
        assert!(!reg.add(Arc::clone(&sub)));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn remove_is_idempotent_and_marks_closed() {
        let reg = SubscriberRegistry::new();
        let sub = subscriber();
        reg.add(Arc::clone(&sub));

        assert!(reg.remove(sub.id()).is_some());
        assert!(sub.is_closed());
        assert!(reg.remove(sub.id()).is_none());
        assert!(reg.is_empty());
    }

    #[test]
    fn closed_subscriber_cannot_rejoin() {
        let reg = SubscriberRegistry::new();
        let sub = subscriber();
        reg.add(Arc::clone(&sub));
        reg.remove(sub.id());

        assert!(!reg.add(Arc::clone(&sub)));
        assert!(!reg.contains(sub.id()));
    }

    #[test]
    fn for_each_sees_stable_snapshot() {
        let reg = SubscriberRegistry::new();
        let a = subscriber();
        let b = subscriber();
        reg.add(Arc::clone(&a));
        reg.add(Arc::clone(&b));

        let mut visited = 0;
        reg.for_each(|sub| {
            visited += 1;
            // mutating during the pass must not deadlock or tear the view
            reg.remove(sub.id());
            reg.add(subscriber());
        });
        assert_eq!(visited, 2);
        assert!(a.is_closed() && b.is_closed());
        assert_eq!(reg.len(), 2);
    }

    #[test]
    fn concurrent_adds_removes_and_iteration() {
        let reg = Arc::new(SubscriberRegistry::new());
        let subs: Vec<Arc<Subscriber>> = (0..400).map(|_| subscriber()).collect();

        std::thread::scope(|scope| {
            // writers: thread i adds its quarter, removes every other one
            for chunk in subs.chunks(100) {
                let reg = &reg;
                scope.spawn(move || {
                    for (i, sub) in chunk.iter().enumerate() {
                        reg.add(Arc::clone(sub));
                        if i % 2 == 0 {
                            reg.remove(sub.id());
                            reg.remove(sub.id());
                        }
                    }
                });
            }
            // readers iterate concurrently
            for _ in 0..4 {
                let reg = &reg;
                scope.spawn(move || {
                    for _ in 0..200 {
                        let mut seen = HashSet::new();
                        reg.for_each(|sub| assert!(seen.insert(sub.id())));
                    }
                });
            }
        });

        let expected: HashSet<SinkId> = subs
            .chunks(100)
            .flat_map(|c| c.iter().enumerate().filter(|(i, _)| i % 2 == 1))
            .map(|(_, s)| s.id())
            .collect();
        let actual: HashSet<SinkId> = reg.snapshot().iter().map(|s| s.id()).collect();
        assert_eq!(reg.len(), expected.len());
        assert_eq!(actual, expected);
    }
}
