//! Virtual endpoint registry
//!
//! The router owns every virtual endpoint of the daemon, keyed by unique
//! name. It creates endpoints as remote attachments become reachable, routes
//! messages to them, and retires them when a lost link leaves them without
//! a usable route.

use crate::config::RouterConfig;
use crate::error::{Result, RoutingError};
use crate::link::{Guid128, LinkHandle, QueueLink};
use crate::message::Message;
use crate::routing::dispatch::Delivery;
use crate::routing::events::{EventHandlers, RouteEvent};
use crate::routing::selection::{FirstAvailable, LinkSelector};
use crate::routing::virtual_endpoint::VirtualEndpoint;
use crate::session::{SessionId, SessionLostReason, SessionOpts};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of `Router::link_lost`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkLossReport {
    /// Endpoints retired because the link was their last usable route
    pub retired: Vec<String>,
    /// Sessions that were routed over the link, per endpoint
    pub lost_sessions: Vec<(String, SessionId)>,
}

/// Registry and entry point for routing to virtual endpoints
pub struct Router {
    /// Virtual endpoints by unique name
    endpoints: DashMap<String, Arc<VirtualEndpoint>>,

    /// Selector handed to every endpoint this router creates
    selector: Arc<dyn LinkSelector>,

    /// Route event subscribers
    events: EventHandlers,

    config: RouterConfig,
}

impl Router {
    /// Create a router with the default configuration and selector
    pub fn new() -> Self {
        Self {
            endpoints: DashMap::new(),
            selector: Arc::new(FirstAvailable),
            events: EventHandlers::new(),
            config: RouterConfig::default(),
        }
    }

    /// Route event subscribers
    pub fn events(&self) -> &EventHandlers {
        &self.events
    }

    /// Active configuration
    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    /// Create a queue link sized by the configured capacity
    pub fn open_queue_link(
        &self,
        unique_name: impl Into<String>,
        remote_guid: Guid128,
    ) -> (Arc<QueueLink>, mpsc::Receiver<Message>) {
        QueueLink::new(unique_name, remote_guid, self.config.link_queue_capacity)
    }

    /// Make `name` reachable through `link`
    ///
    /// Creates the endpoint if needed, otherwise adds `link` as another
    /// direct path. An endpoint that is already stopping is replaced by a
    /// fresh one.
    pub fn add_virtual_endpoint(
        &self,
        name: impl Into<String>,
        link: LinkHandle,
    ) -> Arc<VirtualEndpoint> {
        let name = name.into();
        match self.endpoints.entry(name.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().try_add_link(LinkHandle::clone(&link)).is_some() {
                    return Arc::clone(entry.get());
                }
                tracing::debug!(endpoint = %name, "replacing stopping virtual endpoint");
                let vep = self.create_endpoint(name, link);
                entry.insert(Arc::clone(&vep));
                vep
            },
            Entry::Vacant(entry) => {
                let vep = self.create_endpoint(name, link);
                entry.insert(Arc::clone(&vep));
                vep
            },
        }
    }

    fn create_endpoint(&self, name: String, link: LinkHandle) -> Arc<VirtualEndpoint> {
        tracing::debug!(endpoint = %name, link = link.unique_name(), "new virtual endpoint");
        Arc::new(VirtualEndpoint::with_selector(
            name,
            link,
            Arc::clone(&self.selector),
        ))
    }

    /// Look up an endpoint by unique name
    pub fn get(&self, name: &str) -> Option<Arc<VirtualEndpoint>> {
        self.endpoints.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Route a message to the endpoint named `name`
    pub fn route(&self, name: &str, message: &Message) -> Result<Delivery> {
        let vep = self.get(name).ok_or_else(|| RoutingError::UnknownDestination {
            destination: name.to_string(),
        })?;
        Ok(vep.push_message(message)?)
    }

    /// Bind a session on `name` to the link its selector prefers
    pub fn bind_session(
        &self,
        name: &str,
        session_id: SessionId,
        opts: Option<&SessionOpts>,
    ) -> Result<LinkHandle> {
        let vep = self.get(name).ok_or_else(|| RoutingError::UnknownDestination {
            destination: name.to_string(),
        })?;
        Ok(vep.add_session_route_best(session_id, opts)?)
    }

    /// Drop one binding of a session on `name`
    pub fn unbind_session(&self, name: &str, session_id: SessionId) -> Result<bool> {
        let vep = self.get(name).ok_or_else(|| RoutingError::UnknownDestination {
            destination: name.to_string(),
        })?;
        Ok(vep.remove_session_route(session_id))
    }

    /// Remove `link` from every endpoint and retire the ones left empty
    ///
    /// Subscribers receive a `SessionLost` event for every session that was
    /// routed over the link and an `EndpointRetired` event for every endpoint
    /// removed from the registry.
    pub fn link_lost(&self, link: &LinkHandle, reason: SessionLostReason) -> LinkLossReport {
        let endpoints: Vec<Arc<VirtualEndpoint>> =
            self.endpoints.iter().map(|e| Arc::clone(e.value())).collect();

        let mut report = LinkLossReport::default();
        for vep in endpoints {
            // Session routes ride on direct paths, so an endpoint without a
            // direct entry for the link has nothing to lose.
            if !vep.can_use_link(link) {
                continue;
            }
            let sessions = vep.session_ids_bound_to(link);
            let is_empty = vep.remove_link(link);

            report.lost_sessions.extend(
                sessions
                    .into_iter()
                    .map(|session_id| (vep.unique_name().to_string(), session_id)),
            );

            if is_empty
                && self
                    .endpoints
                    .remove_if(vep.unique_name(), |_, current| Arc::ptr_eq(current, &vep))
                    .is_some()
            {
                tracing::info!(
                    endpoint = vep.unique_name(),
                    link = link.unique_name(),
                    "virtual endpoint retired"
                );
                report.retired.push(vep.unique_name().to_string());
            }
        }

        for (endpoint, session_id) in &report.lost_sessions {
            self.events.dispatch(&RouteEvent::SessionLost {
                endpoint: endpoint.clone(),
                session_id: *session_id,
                reason,
            });
        }
        for name in &report.retired {
            self.events.dispatch(&RouteEvent::EndpointRetired { name: name.clone() });
        }

        report
    }

    /// Endpoints that would have no route left if the daemon `guid` went away
    pub fn unreachable_without(&self, guid: Guid128) -> Vec<String> {
        let mut names: Vec<String> = self
            .endpoints
            .iter()
            .filter(|e| !e.value().can_reach_without(guid))
            .map(|e| e.key().clone())
            .collect();
        names.sort();
        names
    }

    /// Unique names of all registered endpoints, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.endpoints.iter().map(|e| e.key().clone()).collect();
        names.sort();
        names
    }

    /// Number of registered endpoints
    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    /// Whether no endpoint is registered
    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for Router configuration
pub struct RouterBuilder {
    selector: Option<Arc<dyn LinkSelector>>,
    config: Option<RouterConfig>,
    events: Option<EventHandlers>,
}

impl RouterBuilder {
    /// Create a new router builder
    pub fn new() -> Self {
        Self {
            selector: None,
            config: None,
            events: None,
        }
    }

    /// Set the link selector used for session binding
    pub fn selector(mut self, selector: Arc<dyn LinkSelector>) -> Self {
        self.selector = Some(selector);
        self
    }

    /// Set the configuration
    pub fn config(mut self, config: RouterConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Share an existing set of event handlers
    pub fn events(mut self, events: EventHandlers) -> Self {
        self.events = Some(events);
        self
    }

    /// Build the router
    pub fn build(self) -> Result<Router> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        Ok(Router {
            endpoints: DashMap::new(),
            selector: self.selector.unwrap_or_else(|| Arc::new(FirstAvailable)),
            events: self.events.unwrap_or_default(),
            config,
        })
    }
}

impl Default for RouterBuilder {
    fn default() -> Self {
        Self::new()
    }
}
