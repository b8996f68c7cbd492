use std::collections::BTreeMap;

/// Callback invoked after a write makes data available.
///
/// Receives the number of elements currently readable. Runs synchronously on
/// the producer's thread — keep processing minimal, and do not call back
/// into the same ring without reentrancy awareness (no guard is provided).
pub type DataListener = Box<dyn FnMut(usize) + Send>;

/// Handle for removing a registered [`DataListener`].
///
/// Ids increase monotonically and are unique per ring instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Registry of data-available listeners.
///
/// Mutation happens on whatever thread subscribes; delivery happens on the
/// producer thread under a `try_lock`, so the two never block each other.
pub(crate) struct ListenerRegistry {
    next_id: u64,
    listeners: BTreeMap<u64, DataListener>,
}

impl ListenerRegistry {
    pub(crate) fn new() -> Self {
        Self {
            next_id: 0,
            listeners: BTreeMap::new(),
        }
    }

    pub(crate) fn subscribe(&mut self, listener: DataListener) -> SubscriptionId {
        let id = self.next_id;
        self.next_id += 1;
        self.listeners.insert(id, listener);
        SubscriptionId(id)
    }

    /// Remove a listener. Returns `false` if the id was already gone.
    pub(crate) fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        self.listeners.remove(&id.0).is_some()
    }

    /// Invoke every listener. Delivery order across listeners is
    /// unspecified.
    pub(crate) fn notify(&mut self, used: usize) {
        for listener in self.listeners.values_mut() {
            listener(used);
        }
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}
