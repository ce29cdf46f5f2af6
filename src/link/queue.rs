//! Queue-backed link
//!
//! Messages pushed onto a `QueueLink` land in a bounded channel that the
//! transport's writer task drains. Pushing never waits: a full queue is
//! reported as backpressure so the router can try another path.

use crate::error::LinkError;
use crate::link::{Guid128, Link};
use crate::message::Message;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc::{self, error::TrySendError};

/// A link whose outbound side is a bounded message queue
pub struct QueueLink {
    /// Unique bus name of the remote end
    unique_name: String,
    /// Guid of the remote daemon
    remote_guid: Guid128,
    /// Outbound queue
    tx: mpsc::Sender<Message>,
    /// Routing references held by virtual endpoints
    refs: AtomicUsize,
    /// Total messages accepted onto the queue
    messages_sent: AtomicU64,
}

impl QueueLink {
    /// Create a link and the receiving end of its queue
    ///
    /// # Arguments
    ///
    /// * `unique_name` - Bus name of the remote end
    /// * `remote_guid` - Guid of the remote daemon
    /// * `capacity` - Queue depth before pushes report backpressure
    ///
    /// # Panics
    ///
    /// If `capacity` is 0. `RouterConfig::validate` rejects such a capacity
    /// before `Router::open_queue_link` gets to use it.
    pub fn new(
        unique_name: impl Into<String>,
        remote_guid: Guid128,
        capacity: usize,
    ) -> (Arc<Self>, mpsc::Receiver<Message>) {
        let unique_name = unique_name.into();
        assert!(capacity > 0, "queue link {} needs a non-zero capacity", unique_name);
        let (tx, rx) = mpsc::channel(capacity);
        let link = Arc::new(Self {
            unique_name,
            remote_guid,
            tx,
            refs: AtomicUsize::new(0),
            messages_sent: AtomicU64::new(0),
        });
        (link, rx)
    }

    /// Whether the receiving end has been dropped
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Total messages accepted onto the queue
    pub fn messages_sent(&self) -> u64 {
        self.messages_sent.load(Ordering::Relaxed)
    }
}

impl Link for QueueLink {
    fn unique_name(&self) -> &str {
        &self.unique_name
    }

    fn remote_guid(&self) -> Guid128 {
        self.remote_guid
    }

    fn increment_ref(&self) -> usize {
        self.refs.fetch_add(1, Ordering::AcqRel) + 1
    }

    fn decrement_ref(&self) -> usize {
        let prev = self
            .refs
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        match prev {
            Ok(n) => n - 1,
            Err(_) => {
                tracing::warn!(link = %self.unique_name, "routing reference released below zero");
                0
            },
        }
    }

    fn ref_count(&self) -> usize {
        self.refs.load(Ordering::Acquire)
    }

    fn push_message(&self, message: &Message) -> Result<(), LinkError> {
        match self.tx.try_send(message.clone()) {
            Ok(()) => {
                self.messages_sent.fetch_add(1, Ordering::Relaxed);
                Ok(())
            },
            Err(TrySendError::Full(_)) => Err(LinkError::Backpressure {
                name: self.unique_name.clone(),
            }),
            Err(TrySendError::Closed(_)) => Err(LinkError::Closed {
                name: self.unique_name.clone(),
            }),
        }
    }
}

impl std::fmt::Debug for QueueLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueueLink")
            .field("unique_name", &self.unique_name)
            .field("remote_guid", &self.remote_guid.to_short_string())
            .field("refs", &self.ref_count())
            .finish()
    }
}
