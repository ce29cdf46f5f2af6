//! # busroute
//!
//! Routing core of a distributed message-bus daemon: virtual endpoints for
//! bus attachments behind remote daemons, the per-session route tables that
//! map them onto bus-to-bus links, and the reference counting that keeps
//! those links alive while routes depend on them.
//!
//! ## Quick Start
//!
//! ```
//! use busroute::link::Guid128;
//! use busroute::message::Message;
//! use busroute::routing::Router;
//!
//! let router = Router::new();
//! let (link, mut rx) = router.open_queue_link(":b2b.1", Guid128::random());
//! router.add_virtual_endpoint(":remote.2", link);
//!
//! let msg = Message::method_call(1, ":local.1", ":remote.2", "Ping");
//! router.route(":remote.2", &msg).unwrap();
//! assert!(rx.try_recv().is_ok());
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod config;
pub mod error;
pub mod link;
pub mod message;
pub mod routing;
pub mod session;

// Re-export main types
pub use config::RouterConfig;
pub use error::{BusError, ConfigError, LinkError, Result, RoutingError};
pub use link::{Guid128, Link, LinkHandle, QueueLink};
pub use message::{Message, MessageType};
pub use routing::{
    Delivery, EndpointState, EventHandlers, FirstAvailable, LinkLossReport, LinkSelector,
    RouteEvent, RouteTable, Router, RouterBuilder, VirtualEndpoint,
};
pub use session::{SessionId, SessionLostReason, SessionOpts};
