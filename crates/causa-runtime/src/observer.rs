//! Delivery observers

use std::fmt;
use std::sync::Arc;

use causa_core::{Event, ProcessId};
use parking_lot::RwLock;

/// Listener invoked with `(process, event)` for every event appended to a
/// history
pub type Listener<Ts, T> = Arc<dyn Fn(&ProcessId, &Event<Ts, T>) + Send + Sync>;

/// Shared listener list. Cloning shares the list, so listeners registered
/// after processes were spawned still see later events.
pub struct Observers<Ts, T> {
    listeners: Arc<RwLock<Vec<Listener<Ts, T>>>>,
}

impl<Ts, T> Observers<Ts, T> {
    pub fn new() -> Self {
        Observers {
            listeners: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register a listener
    pub fn register<F>(&self, listener: F)
    where
        F: Fn(&ProcessId, &Event<Ts, T>) + Send + Sync + 'static,
    {
        self.listeners.write().push(Arc::new(listener));
    }

    /// Invoke every listener, in registration order. Listeners run on a
    /// snapshot of the list with no lock held, so they may register more.
    pub fn notify(&self, process: &ProcessId, event: &Event<Ts, T>) {
        let listeners = self.listeners.read().clone();
        for listener in &listeners {
            listener(process, event);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<Ts, T> Clone for Observers<Ts, T> {
    fn clone(&self) -> Self {
        Observers {
            listeners: Arc::clone(&self.listeners),
        }
    }
}

impl<Ts, T> Default for Observers<Ts, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Ts, T> fmt::Debug for Observers<Ts, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Observers")
            .field("listeners", &self.len())
            .finish()
    }
}
