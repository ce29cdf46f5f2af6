//! Common test helpers and utilities
//!
//! This module provides a scripted link for integration tests. It counts
//! routing references, records every send attempt into a shared log, can be
//! switched into a failing mode and can run a hook in the middle of a send.

#![allow(dead_code)]

use busroute::config::RouterConfig;
use busroute::error::LinkError;
use busroute::link::{Guid128, Link, LinkHandle};
use busroute::message::Message;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

/// Names of links in the order sends were attempted on them
pub type SendLog = Arc<Mutex<Vec<String>>>;

/// Callback run inside `TestLink::push_message`
pub type PushHook = Arc<dyn Fn(&Message) + Send + Sync>;

/// Link stub with scripted outcomes
pub struct TestLink {
    name: String,
    guid: Guid128,
    refs: AtomicUsize,
    failing: AtomicBool,
    accepted: AtomicUsize,
    log: SendLog,
    on_push: Mutex<Option<PushHook>>,
}

impl TestLink {
    /// Create a link that accepts every message
    pub fn new(name: &str, guid: Guid128) -> Arc<Self> {
        Self::with_log(name, guid, &new_log())
    }

    /// Create a link that records attempts into `log`
    pub fn with_log(name: &str, guid: Guid128, log: &SendLog) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            guid,
            refs: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
            accepted: AtomicUsize::new(0),
            log: Arc::clone(log),
            on_push: Mutex::new(None),
        })
    }

    /// Make every following send fail (or succeed again)
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Run `hook` on every following send, after it is logged
    pub fn set_on_push<F>(&self, hook: F)
    where
        F: Fn(&Message) + Send + Sync + 'static,
    {
        let hook: PushHook = Arc::new(hook);
        *self.on_push.lock() = Some(hook);
    }

    /// Number of messages this link accepted
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// This link as a shared handle
    pub fn handle(self: &Arc<Self>) -> LinkHandle {
        Arc::clone(self) as LinkHandle
    }
}

impl Link for TestLink {
    fn unique_name(&self) -> &str {
        &self.name
    }

    fn remote_guid(&self) -> Guid128 {
        self.guid
    }

    fn increment_ref(&self) -> usize {
        self.refs.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn decrement_ref(&self) -> usize {
        let prev = self.refs.fetch_sub(1, Ordering::SeqCst);
        assert!(prev > 0, "reference released twice on {}", self.name);
        prev - 1
    }

    fn ref_count(&self) -> usize {
        self.refs.load(Ordering::SeqCst)
    }

    fn push_message(&self, message: &Message) -> Result<(), LinkError> {
        self.log.lock().push(self.name.clone());
        // Cloned out so the hook may send on this link again
        let hook = self.on_push.lock().clone();
        if let Some(hook) = hook {
            hook(message);
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(LinkError::Rejected {
                name: self.name.clone(),
                reason: "scripted failure".to_string(),
            });
        }
        self.accepted.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Install a test-friendly subscriber using the default log filter
///
/// Safe to call from every test; only the first call installs anything.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(RouterConfig::default().log_filter.as_str())
        .with_test_writer()
        .try_init();
}

/// Create an empty send log
pub fn new_log() -> SendLog {
    Arc::new(Mutex::new(Vec::new()))
}

/// Create a test message in the default session
pub fn create_test_message(serial: u32) -> Message {
    Message::method_call(serial, ":local.1", ":remote.1", "Ping")
}
