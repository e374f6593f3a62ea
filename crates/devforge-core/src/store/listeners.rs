// ── Change listeners ──
//
// Callback registry for store mutations. A `Subscription` owns its
// registration and removes it on drop.

use std::sync::{Arc, Mutex, Weak};

use super::lock;
use crate::stream::Snapshot;

pub(crate) type Listener = Arc<dyn Fn(Snapshot) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: Vec<(u64, Listener)>,
}

#[derive(Default)]
pub(crate) struct Listeners {
    registry: Arc<Mutex<Registry>>,
}

impl Listeners {
    pub(crate) fn add(&self, listener: Listener) -> Subscription {
        let mut registry = lock(&self.registry);
        registry.next_id += 1;
        let id = registry.next_id;
        registry.entries.push((id, listener));
        Subscription {
            id,
            registry: Arc::downgrade(&self.registry),
            active: true,
        }
    }

    /// Call every listener in registration order. The registry lock is not
    /// held while listeners run, so a listener may subscribe or unsubscribe.
    pub(crate) fn notify(&self, snapshot: &Snapshot) {
        let listeners: Vec<Listener> = lock(&self.registry)
            .entries
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener(Arc::clone(snapshot));
        }
    }

    pub(crate) fn len(&self) -> usize {
        lock(&self.registry).entries.len()
    }
}

/// Handle for a registered store listener.
///
/// Dropping it (or calling [`unsubscribe`](Self::unsubscribe)) removes the
/// listener. Use [`detach`](Self::detach) to keep it for the store's lifetime.
#[must_use = "dropping a Subscription immediately unsubscribes the listener"]
pub struct Subscription {
    id: u64,
    registry: Weak<Mutex<Registry>>,
    active: bool,
}

impl Subscription {
    pub fn unsubscribe(self) {}

    pub fn detach(mut self) {
        self.active = false;
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if !self.active {
            return;
        }
        if let Some(registry) = self.registry.upgrade() {
            lock(&registry).entries.retain(|(id, _)| *id != self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("active", &self.active)
            .finish()
    }
}
