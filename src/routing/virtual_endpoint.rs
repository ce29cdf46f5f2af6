//! Virtual endpoints
//!
//! A virtual endpoint stands in for a bus attachment that lives behind a
//! remote daemon. It is reachable through one or more bus-to-bus links, and
//! which links carry a given message depends on the session the message
//! belongs to.
//!
//! Each endpoint guards its route table with its own lock. Sends snapshot the
//! candidate links under the lock and push to them after releasing it, so a
//! congested link never stalls routing decisions for the same destination.

use crate::error::RoutingError;
use crate::link::{Guid128, LinkHandle};
use crate::message::Message;
use crate::routing::dispatch::{deliver, Delivery};
use crate::routing::route_table::RouteTable;
use crate::routing::selection::{FirstAvailable, LinkSelector};
use crate::session::{SessionId, SessionOpts};
use parking_lot::Mutex;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Lifecycle state of a virtual endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndpointState {
    /// Routing normally
    Started,
    /// No usable route remains; waiting to be retired
    Stopping,
}

struct EndpointInner {
    state: EndpointState,
    /// Set once the first session route is added, never cleared
    has_refs: bool,
    routes: RouteTable,
}

/// A remote bus attachment reachable through bus-to-bus links
pub struct VirtualEndpoint {
    unique_name: String,
    inner: Mutex<EndpointInner>,
    selector: Arc<dyn LinkSelector>,
}

impl VirtualEndpoint {
    /// Create an endpoint reachable through `link`
    pub fn new(unique_name: impl Into<String>, link: LinkHandle) -> Self {
        Self::with_selector(unique_name, link, Arc::new(FirstAvailable))
    }

    /// Create an endpoint that picks session links with `selector`
    pub fn with_selector(
        unique_name: impl Into<String>,
        link: LinkHandle,
        selector: Arc<dyn LinkSelector>,
    ) -> Self {
        Self {
            unique_name: unique_name.into(),
            inner: Mutex::new(EndpointInner {
                state: EndpointState::Started,
                has_refs: false,
                routes: RouteTable::with_direct(link),
            }),
            selector,
        }
    }

    /// Unique bus name of the remote attachment
    pub fn unique_name(&self) -> &str {
        &self.unique_name
    }

    /// Current lifecycle state
    pub fn state(&self) -> EndpointState {
        self.inner.lock().state
    }

    /// Whether the endpoint lost its last usable route
    pub fn is_stopping(&self) -> bool {
        self.state() == EndpointState::Stopping
    }

    /// Whether a session route was ever added
    pub fn has_session_refs(&self) -> bool {
        self.inner.lock().has_refs
    }

    /// Total number of route entries, direct and session
    pub fn route_count(&self) -> usize {
        self.inner.lock().routes.len()
    }

    /// Route a message along the session it carries
    pub fn push_message(&self, message: &Message) -> Result<Delivery, RoutingError> {
        self.push_message_to_session(message, message.session_id())
    }

    /// Route a message along the links bound to exactly `session_id`
    ///
    /// Session 0 uses only the direct paths; any other session uses only its
    /// own bindings and never falls back to the direct paths. Candidates are
    /// tried in insertion order until one accepts the message.
    pub fn push_message_to_session(
        &self,
        message: &Message,
        session_id: SessionId,
    ) -> Result<Delivery, RoutingError> {
        tracing::trace!(
            endpoint = %self.unique_name,
            session = %session_id,
            serial = message.serial(),
            "push message"
        );

        let candidates = self.inner.lock().routes.candidates(session_id);

        deliver(&candidates, message).map_err(|attempts| {
            tracing::debug!(
                endpoint = %self.unique_name,
                session = %session_id,
                attempts,
                "no route for message"
            );
            RoutingError::NoRoute {
                destination: self.unique_name.clone(),
                session_id,
                attempts,
            }
        })
    }

    /// Add a direct path; returns false if this exact link is already one
    ///
    /// # Panics
    ///
    /// If the endpoint is stopping.
    pub fn add_link(&self, link: LinkHandle) -> bool {
        let mut inner = self.inner.lock();
        assert_eq!(
            inner.state,
            EndpointState::Started,
            "link added to stopping virtual endpoint {}",
            self.unique_name
        );

        let name = link.unique_name().to_string();
        let added = inner.routes.insert_direct(link);
        drop(inner);

        tracing::trace!(endpoint = %self.unique_name, link = %name, added, "add link");
        added
    }

    /// Like `add_link`, but returns `None` instead of panicking when stopping
    pub(crate) fn try_add_link(&self, link: LinkHandle) -> Option<bool> {
        let mut inner = self.inner.lock();
        if inner.state != EndpointState::Started {
            return None;
        }
        Some(inner.routes.insert_direct(link))
    }

    /// Remove every route through `link`; returns true if the endpoint is now empty
    ///
    /// Session entries release their link reference. An endpoint that never
    /// had session routes is empty once its table is. Otherwise it is empty
    /// once no session route remains and no remaining path leads to the same
    /// remote daemon as `link`. The second rule stops a fully meshed
    /// triangle of daemons from keeping a departed daemon alive through each
    /// other.
    pub fn remove_link(&self, link: &LinkHandle) -> bool {
        let mut inner = self.inner.lock();
        let removed = inner.routes.remove_link(link);

        let is_empty = if inner.has_refs {
            !inner.routes.has_session_routes() && !inner.routes.reaches_guid(link.remote_guid())
        } else {
            inner.routes.is_empty()
        };
        if is_empty {
            inner.state = EndpointState::Stopping;
        }
        drop(inner);

        tracing::trace!(
            endpoint = %self.unique_name,
            link = link.unique_name(),
            removed = removed.total(),
            released = removed.sessions.len(),
            is_empty,
            "remove link"
        );
        is_empty
    }

    /// Bind `session_id` to `link`, which must already be a direct path
    ///
    /// # Panics
    ///
    /// If `session_id` is 0.
    pub fn add_session_route(
        &self,
        session_id: SessionId,
        link: &LinkHandle,
    ) -> Result<(), RoutingError> {
        assert!(
            !session_id.is_default(),
            "session route on {} requires a non-zero session id",
            self.unique_name
        );
        let mut inner = self.inner.lock();
        self.bind_locked(&mut inner, session_id, LinkHandle::clone(link))
    }

    /// Bind `session_id` to a link chosen by this endpoint's selector
    ///
    /// Returns the chosen link.
    ///
    /// # Panics
    ///
    /// If `session_id` is 0.
    pub fn add_session_route_best(
        &self,
        session_id: SessionId,
        opts: Option<&SessionOpts>,
    ) -> Result<LinkHandle, RoutingError> {
        assert!(
            !session_id.is_default(),
            "session route on {} requires a non-zero session id",
            self.unique_name
        );
        let mut inner = self.inner.lock();

        let chosen = self
            .selector
            .select(&inner.routes, session_id, opts)
            .ok_or_else(|| RoutingError::NoEndpoint {
                destination: self.unique_name.clone(),
                session_id,
            })?;

        self.bind_locked(&mut inner, session_id, LinkHandle::clone(&chosen))?;
        Ok(chosen)
    }

    fn bind_locked(
        &self,
        inner: &mut EndpointInner,
        session_id: SessionId,
        link: LinkHandle,
    ) -> Result<(), RoutingError> {
        let name = link.unique_name().to_string();
        if !inner.routes.bind_session(session_id, link) {
            tracing::debug!(
                endpoint = %self.unique_name,
                session = %session_id,
                link = %name,
                "session route refused: link is not a direct path"
            );
            return Err(RoutingError::NoEndpoint {
                destination: self.unique_name.clone(),
                session_id,
            });
        }
        inner.has_refs = true;

        tracing::trace!(endpoint = %self.unique_name, session = %session_id, link = %name, "add session route");
        Ok(())
    }

    /// Drop one binding of `session_id`; returns false if none existed
    ///
    /// # Panics
    ///
    /// If `session_id` is 0.
    pub fn remove_session_route(&self, session_id: SessionId) -> bool {
        assert!(
            !session_id.is_default(),
            "session route on {} requires a non-zero session id",
            self.unique_name
        );
        let removed = self.inner.lock().routes.unbind_session(session_id);

        match removed {
            Some(link) => {
                tracing::trace!(
                    endpoint = %self.unique_name,
                    session = %session_id,
                    link = link.unique_name(),
                    "remove session route"
                );
                true
            },
            None => {
                tracing::debug!(
                    endpoint = %self.unique_name,
                    session = %session_id,
                    "no route bound to session"
                );
                false
            },
        }
    }

    /// First link bound to `session_id` and how many links share that key
    pub fn resolve_default_link(&self, session_id: SessionId) -> (Option<LinkHandle>, usize) {
        self.inner.lock().routes.first_bound(session_id)
    }

    /// Whether `link` is a direct path of this endpoint
    pub fn can_use_link(&self, link: &LinkHandle) -> bool {
        self.inner.lock().routes.has_direct(link)
    }

    /// Sessions currently bound to `link`
    pub fn session_ids_bound_to(&self, link: &LinkHandle) -> BTreeSet<SessionId> {
        self.inner.lock().routes.session_ids_for(link)
    }

    /// Whether some route leads through a daemon other than `guid`
    pub fn can_reach_without(&self, guid: Guid128) -> bool {
        self.inner.lock().routes.can_route_without(guid)
    }

    /// Whether any bound link's unique name appears in `names`
    pub fn has_any_link_from<I>(&self, names: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        self.inner.lock().routes.has_link_named(names)
    }
}

impl std::fmt::Debug for VirtualEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.lock();
        f.debug_struct("VirtualEndpoint")
            .field("unique_name", &self.unique_name)
            .field("state", &inner.state)
            .field("has_refs", &inner.has_refs)
            .field("routes", &inner.routes)
            .finish()
    }
}
