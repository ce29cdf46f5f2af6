//! Routing to virtual endpoints
//!
//! This module decides which bus-to-bus link carries a message addressed to
//! a bus attachment behind another daemon, and when such a destination has
//! stopped being reachable.
//!
//! # Architecture
//!
//! - **RouteTable**: session-keyed multi-map of links, owning the link
//!   reference-count discipline
//! - **VirtualEndpoint**: one per remote attachment; a route table behind a
//!   lock plus a `Started`/`Stopping` state
//! - **Dispatch**: first-success delivery over a snapshot of candidate links
//! - **LinkSelector**: strategy picking a link when a session is bound
//! - **Router**: registry of virtual endpoints and link-loss handling
//!
//! # Sessions and the default route
//!
//! Session id `0` names the direct paths to a remote daemon. A session
//! binding (non-zero id) can only ride on a link that is already a direct
//! path, and takes one routing reference on that link for as long as it
//! exists. Messages in a session are only ever sent over that session's
//! bindings.
//!
//! # Retirement
//!
//! Removing a link reports whether the endpoint is left without a usable
//! route. Once any session has been bound, an endpoint counts as empty when
//! no session route remains and no remaining path reaches the same remote
//! daemon as the removed link, even if paths through other daemons remain.
//! Without this, three fully meshed daemons would each keep believing a
//! departed fourth party is reachable through the other two.
//!
//! # Example
//!
//! ```
//! use busroute::link::{Guid128, LinkHandle, QueueLink};
//! use busroute::message::Message;
//! use busroute::routing::VirtualEndpoint;
//! use busroute::session::SessionId;
//! use std::sync::Arc;
//!
//! let (link, mut rx) = QueueLink::new(":b2b.1", Guid128::random(), 16);
//! let link: LinkHandle = link;
//! let vep = VirtualEndpoint::new(":remote.7", Arc::clone(&link));
//!
//! vep.add_session_route(SessionId::new(42), &link).unwrap();
//! let msg = Message::method_call(1, ":local.1", ":remote.7", "Ping")
//!     .with_session(SessionId::new(42));
//! vep.push_message(&msg).unwrap();
//!
//! assert_eq!(rx.try_recv().unwrap().serial(), 1);
//! ```

mod dispatch;
mod events;
mod route_table;
mod router;
mod selection;
mod virtual_endpoint;

pub use dispatch::{deliver, Delivery};
pub use events::{EventCallback, EventHandlers, RouteEvent, SubscriptionHandle};
pub use route_table::{RemovedRoutes, RouteTable};
pub use router::{LinkLossReport, Router, RouterBuilder};
pub use selection::{FirstAvailable, LinkSelector};
pub use virtual_endpoint::{EndpointState, VirtualEndpoint};
