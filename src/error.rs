//! Error types for busroute
//!
//! Errors are grouped by concern. Routing failures are ordinary results that
//! the routing layer turns into a "no route to destination" reply; they never
//! indicate a bug. Caller-contract violations (adding a link to a stopping
//! endpoint, using session id 0 for a session route) panic instead.

use crate::session::SessionId;
use thiserror::Error;

/// Main error type for busroute operations
#[derive(Error, Debug)]
pub enum BusError {
    /// Routing errors
    #[error("Routing error: {0}")]
    Routing(#[from] RoutingError),

    /// Link errors
    #[error("Link error: {0}")]
    Link(#[from] LinkError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Route resolution and session binding failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RoutingError {
    /// No candidate link accepted the message
    #[error("No route to {destination} (session {session_id}) after {attempts} attempt(s)")]
    NoRoute {
        /// Unique name of the virtual endpoint
        destination: String,
        /// Session the message was routed under
        session_id: SessionId,
        /// Number of links that were tried
        attempts: usize,
    },

    /// The link is not a direct path of this endpoint, or no link could be chosen
    #[error("No usable link on {destination} for session {session_id}")]
    NoEndpoint {
        /// Unique name of the virtual endpoint
        destination: String,
        /// Session that was being bound
        session_id: SessionId,
    },

    /// No virtual endpoint is registered under this name
    #[error("Unknown destination: {destination}")]
    UnknownDestination {
        /// Requested unique name
        destination: String,
    },
}

/// Failures reported by a link when handed a message
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LinkError {
    /// The transport side of the link has gone away
    #[error("Link {name} is closed")]
    Closed {
        /// Unique name of the link
        name: String,
    },

    /// The link's outbound queue is full
    #[error("Link {name} is congested")]
    Backpressure {
        /// Unique name of the link
        name: String,
    },

    /// The link refused the message for another reason
    #[error("Link {name} rejected message: {reason}")]
    Rejected {
        /// Unique name of the link
        name: String,
        /// Why the message was refused
        reason: String,
    },
}

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A field holds an unusable value
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue {
        /// Name of the offending field
        field: &'static str,
        /// Why it was rejected
        reason: String,
    },

    /// The configuration could not be encoded or decoded
    #[error("Serialization failed: {reason}")]
    SerializationFailed {
        /// Underlying serde error text
        reason: String,
    },
}

/// Result type alias
pub type Result<T> = std::result::Result<T, BusError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_routing_error_display() {
        let err = RoutingError::NoRoute {
            destination: ":abc.2".to_string(),
            session_id: SessionId::new(7),
            attempts: 3,
        };
        assert_eq!(
            err.to_string(),
            "No route to :abc.2 (session 7) after 3 attempt(s)"
        );
    }

    #[test]
    fn test_conversion_into_bus_error() {
        let err: BusError = LinkError::Closed {
            name: ":b2b.1".to_string(),
        }
        .into();
        assert!(matches!(err, BusError::Link(LinkError::Closed { .. })));
        assert_eq!(err.to_string(), "Link error: Link :b2b.1 is closed");
    }
}
