//! Document subscribers.

use diffsync_protocol::PatchMessage;
use diffsync_store::CasMap;
use std::sync::Arc;

/// A connected client that receives patch messages pushed by the server.
///
/// The transport owns the actual write; `patched` must not block on it.
pub trait Subscriber<D>: Send + Sync {
    /// The client this subscriber delivers to.
    fn client_id(&self) -> &str;

    /// Delivers a patch message.
    fn patched(&self, message: PatchMessage<D>);
}

type Subscribers<D> = Vec<Arc<dyn Subscriber<D>>>;

/// Subscribers per document.
///
/// Registration and removal are compare-and-swap retries over an immutable
/// list, so a fan-out iterating a snapshot never sees a half-updated set.
/// A document holds at most one subscriber per client id.
pub struct SubscriberRegistry<D> {
    documents: CasMap<String, Subscribers<D>>,
}

impl<D> Default for SubscriberRegistry<D> {
    fn default() -> Self {
        Self {
            documents: CasMap::new(),
        }
    }
}

impl<D> SubscriberRegistry<D> {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `subscriber` for `document_id`, replacing any subscriber
    /// with the same client id.
    pub fn add(&self, document_id: &str, subscriber: Arc<dyn Subscriber<D>>) {
        let key = document_id.to_string();
        self.documents.update(&key, |current| {
            let mut next: Subscribers<D> = current
                .into_iter()
                .flatten()
                .filter(|existing| existing.client_id() != subscriber.client_id())
                .cloned()
                .collect();
            next.push(Arc::clone(&subscriber));
            Some(next)
        });
    }

    /// Removes `subscriber` from `document_id`.
    ///
    /// Only that exact subscriber is removed; a newer connection for the
    /// same client stays registered. Returns true if it was registered.
    pub fn remove(&self, document_id: &str, subscriber: &Arc<dyn Subscriber<D>>) -> bool {
        let key = document_id.to_string();
        loop {
            let Some(current) = self.documents.get(&key) else {
                return false;
            };
            if !current.iter().any(|existing| Arc::ptr_eq(existing, subscriber)) {
                return false;
            }
            let remaining: Subscribers<D> = current
                .iter()
                .filter(|existing| !Arc::ptr_eq(existing, subscriber))
                .cloned()
                .collect();
            let removed = if remaining.is_empty() {
                self.documents.compare_and_remove(&key, &current)
            } else {
                self.documents.compare_and_swap(&key, &current, remaining)
            };
            if removed {
                return true;
            }
        }
    }

    /// Snapshot of the subscribers of `document_id`.
    pub fn subscribers(&self, document_id: &str) -> Vec<Arc<dyn Subscriber<D>>> {
        self.documents
            .get(&document_id.to_string())
            .map(|list| list.as_ref().clone())
            .unwrap_or_default()
    }

    /// Returns true if some subscriber for `client_id` is registered.
    pub fn contains(&self, document_id: &str, client_id: &str) -> bool {
        self.documents
            .get(&document_id.to_string())
            .is_some_and(|list| list.iter().any(|s| s.client_id() == client_id))
    }

    /// Returns true if this exact subscriber is registered.
    pub fn is_subscribed(&self, document_id: &str, subscriber: &Arc<dyn Subscriber<D>>) -> bool {
        self.documents
            .get(&document_id.to_string())
            .is_some_and(|list| list.iter().any(|s| Arc::ptr_eq(s, subscriber)))
    }

    /// Documents with at least one subscriber.
    pub fn document_ids(&self) -> Vec<String> {
        self.documents.keys()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;
    use std::thread;

    struct Named(String);

    impl Subscriber<()> for Named {
        fn client_id(&self) -> &str {
            &self.0
        }

        fn patched(&self, _message: PatchMessage<()>) {}
    }

    fn subscriber(client_id: &str) -> Arc<dyn Subscriber<()>> {
        Arc::new(Named(client_id.to_string()))
    }

    #[test]
    fn add_and_remove() {
        let registry = SubscriberRegistry::new();
        let a = subscriber("a");
        let b = subscriber("b");
        registry.add("d1", Arc::clone(&a));
        registry.add("d1", Arc::clone(&b));

        assert_eq!(registry.subscribers("d1").len(), 2);
        assert!(registry.contains("d1", "a"));
        assert!(registry.is_subscribed("d1", &b));

        assert!(registry.remove("d1", &a));
        assert!(!registry.remove("d1", &a));
        assert!(!registry.contains("d1", "a"));

        assert!(registry.remove("d1", &b));
        assert!(registry.subscribers("d1").is_empty());
        assert!(registry.document_ids().is_empty());
    }

    #[test]
    fn same_client_is_replaced() {
        let registry = SubscriberRegistry::new();
        let old = subscriber("a");
        let new = subscriber("a");
        registry.add("d1", Arc::clone(&old));
        registry.add("d1", Arc::clone(&new));

        assert_eq!(registry.subscribers("d1").len(), 1);
        assert!(registry.is_subscribed("d1", &new));

        // A stale connection closing does not evict its replacement.
        assert!(!registry.remove("d1", &old));
        assert!(registry.is_subscribed("d1", &new));
    }

    #[test]
    fn documents_are_independent() {
        let registry = SubscriberRegistry::new();
        let a = subscriber("a");
        registry.add("d1", Arc::clone(&a));
        registry.add("d2", Arc::clone(&a));

        registry.remove("d1", &a);
        assert!(registry.is_subscribed("d2", &a));
    }

    #[test]
    fn concurrent_connect_and_disconnect() {
        let registry = Arc::new(SubscriberRegistry::new());
        let barrier = Arc::new(Barrier::new(8));
        let stable = subscriber("stable");
        registry.add("d1", Arc::clone(&stable));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let sub = subscriber(&format!("c{i}"));
                    barrier.wait();
                    for _ in 0..50 {
                        registry.add("d1", Arc::clone(&sub));
                        assert!(registry.remove("d1", &sub));
                    }
                    if i % 2 == 0 {
                        registry.add("d1", sub);
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        let ids: Vec<String> = registry
            .subscribers("d1")
            .iter()
            .map(|s| s.client_id().to_string())
            .collect();
        assert_eq!(ids.len(), 5);
        assert!(ids.contains(&"stable".to_string()));
        for i in (0..8).step_by(2) {
            assert!(ids.contains(&format!("c{i}")));
        }
    }
}
