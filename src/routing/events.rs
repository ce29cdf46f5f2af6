//! Route events
//!
//! The router reports endpoint retirement and lost sessions to subscribers,
//! typically the name table and the session manager of the daemon.

use crate::session::{SessionId, SessionLostReason};
use parking_lot::RwLock;
use std::sync::Arc;

/// Events raised by the router
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteEvent {
    /// A virtual endpoint lost its last usable route and was removed
    EndpointRetired {
        /// Unique name of the retired endpoint
        name: String,
    },

    /// A session route went away with the link carrying it
    SessionLost {
        /// Unique name of the virtual endpoint
        endpoint: String,
        /// Session that lost its route
        session_id: SessionId,
        /// Why the link went away
        reason: SessionLostReason,
    },
}

/// Handle for unsubscribing from events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionHandle(u64);

/// Type alias for event handler callbacks
pub type EventCallback = Arc<dyn Fn(&RouteEvent) + Send + Sync + 'static>;

/// Registered route event handlers
///
/// Cheap to clone; clones share the same subscriber list.
#[derive(Clone)]
pub struct EventHandlers {
    handlers: Arc<RwLock<Vec<(SubscriptionHandle, EventCallback)>>>,
    next_id: Arc<RwLock<u64>>,
}

impl EventHandlers {
    /// Create an empty handler registry
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
            next_id: Arc::new(RwLock::new(0)),
        }
    }

    /// Register a handler for all future events
    pub fn subscribe<F>(&self, callback: F) -> SubscriptionHandle
    where
        F: Fn(&RouteEvent) + Send + Sync + 'static,
    {
        let handle = {
            let mut next_id = self.next_id.write();
            let handle = SubscriptionHandle(*next_id);
            *next_id += 1;
            handle
        };

        self.handlers.write().push((handle, Arc::new(callback)));
        handle
    }

    /// Remove a handler; unknown handles are ignored
    pub fn unsubscribe(&self, handle: SubscriptionHandle) {
        self.handlers.write().retain(|(h, _)| *h != handle);
    }

    /// Deliver `event` to every handler in registration order
    ///
    /// A panicking handler is logged and skipped. Handlers run on a snapshot
    /// of the subscriber list, so they may subscribe or unsubscribe freely.
    pub fn dispatch(&self, event: &RouteEvent) {
        let handlers: Vec<(SubscriptionHandle, EventCallback)> = self.handlers.read().clone();

        for (handle, callback) in handlers {
            if let Err(e) = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                callback(event);
            })) {
                tracing::error!(
                    "Route event handler {:?} panicked: {:?}",
                    handle,
                    e.downcast_ref::<&str>()
                        .copied()
                        .or_else(|| e.downcast_ref::<String>().map(|s| s.as_str()))
                        .unwrap_or("unknown panic")
                );
            }
        }
    }

    /// Number of registered handlers
    pub fn handler_count(&self) -> usize {
        self.handlers.read().len()
    }
}

impl Default for EventHandlers {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn retired(name: &str) -> RouteEvent {
        RouteEvent::EndpointRetired {
            name: name.to_string(),
        }
    }

    #[test]
    fn test_dispatch_reaches_subscribers_in_order() {
        let handlers = EventHandlers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        let seen1 = Arc::clone(&seen);
        handlers.subscribe(move |_| seen1.lock().push(1));
        let seen2 = Arc::clone(&seen);
        handlers.subscribe(move |_| seen2.lock().push(2));

        handlers.dispatch(&retired(":remote.1"));
        assert_eq!(*seen.lock(), vec![1, 2]);
    }

    #[test]
    fn test_unsubscribe() {
        let handlers = EventHandlers::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let handle = handlers.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });
        assert_eq!(handlers.handler_count(), 1);

        handlers.unsubscribe(handle);
        handlers.dispatch(&retired(":remote.1"));

        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(handlers.handler_count(), 0);
    }

    #[test]
    fn test_panicking_handler_is_isolated() {
        let handlers = EventHandlers::new();
        let count = Arc::new(AtomicUsize::new(0));

        handlers.subscribe(|_| panic!("handler panic"));
        let count_clone = Arc::clone(&count);
        handlers.subscribe(move |_| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        handlers.dispatch(&retired(":remote.1"));
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_handler_may_unsubscribe_during_dispatch() {
        let handlers = EventHandlers::new();
        let inner = handlers.clone();
        let handle = Arc::new(Mutex::new(None));
        let handle_clone = Arc::clone(&handle);

        let h = handlers.subscribe(move |_| {
            if let Some(h) = handle_clone.lock().take() {
                inner.unsubscribe(h);
            }
        });
        *handle.lock() = Some(h);

        handlers.dispatch(&retired(":remote.1"));
        assert_eq!(handlers.handler_count(), 0);
    }
}
