//! Listener registry and message fan-out

use std::sync::Arc;

use parking_lot::Mutex;
use plmlink_core::Message;

/// Observer of inbound bus traffic
///
/// Every successfully parsed message is delivered to every registered
/// listener, in registration order, synchronously on the port's reader task.
/// Callbacks should therefore return quickly; anything slow belongs on a
/// channel to another task.
pub trait MsgListener: Send + Sync {
    /// Called for each inbound message; `source` identifies the port
    fn on_message(&self, msg: &Message, source: &str);
}

/// Ordered collection of listeners with copy-on-read dispatch
#[derive(Default)]
pub struct ListenerRegistry {
    listeners: Mutex<Vec<Arc<dyn MsgListener>>>,
}

impl ListenerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener; adding one that is already registered is a no-op
    ///
    /// Returns false if the listener was already present.
    pub fn add(&self, listener: Arc<dyn MsgListener>) -> bool {
        let mut listeners = self.listeners.lock();
        if listeners.iter().any(|l| Arc::ptr_eq(l, &listener)) {
            return false;
        }
        listeners.push(listener);
        true
    }

    /// Deregister a listener; removing one that is absent is a no-op
    ///
    /// Takes a plain reference so a listener can remove itself from inside
    /// its own callback. Returns false if the listener was not registered.
    pub fn remove(&self, listener: &dyn MsgListener) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|l| !std::ptr::addr_eq(Arc::as_ptr(l), listener));
        listeners.len() != before
    }

    /// Number of registered listeners
    pub fn len(&self) -> usize {
        self.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.listeners.lock().is_empty()
    }

    /// Remove all listeners
    pub fn clear(&self) {
        self.listeners.lock().clear();
    }

    /// Deliver one message to every listener registered at the time of the
    /// call
    ///
    /// Iterates over a snapshot, so a listener mutating the registry during
    /// its callback neither corrupts the iteration nor affects delivery of
    /// the current message to listeners later in the snapshot.
    pub fn dispatch(&self, msg: &Message, source: &str) {
        let snapshot: Vec<Arc<dyn MsgListener>> = self.listeners.lock().clone();
        for listener in snapshot {
            listener.on_message(msg, source);
        }
    }
}
