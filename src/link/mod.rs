//! Bus-to-bus links
//!
//! A link is a live connection to one neighboring daemon. It can carry
//! traffic for many virtual endpoints and sessions at once, so it is shared
//! through `Arc` handles and keeps its own routing reference count.

mod queue;

pub use queue::QueueLink;

use crate::error::LinkError;
use crate::message::Message;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Globally unique id of a daemon
///
/// Distinct from the daemon's bus name. Two links with the same remote guid
/// are parallel paths to the same physical daemon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Guid128([u8; 16]);

impl Guid128 {
    /// Generate a random guid
    pub fn random() -> Self {
        Self(rand::random())
    }

    /// Create a guid from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }

    /// Get the raw bytes
    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }

    /// Get a hexadecimal string representation
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Short form used in bus names and logs (first 8 hex digits)
    pub fn to_short_string(&self) -> String {
        self.to_hex()[..8].to_string()
    }
}

impl fmt::Display for Guid128 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// A connection to one remote daemon, as seen by the routing core
pub trait Link: Send + Sync {
    /// Unique bus name of the remote end of this link
    fn unique_name(&self) -> &str;

    /// Guid of the remote daemon
    fn remote_guid(&self) -> Guid128;

    /// Take a routing reference; returns the new count
    fn increment_ref(&self) -> usize;

    /// Release a routing reference; returns the new count
    fn decrement_ref(&self) -> usize;

    /// Current number of routing references
    fn ref_count(&self) -> usize;

    /// Hand a message to the link for delivery
    ///
    /// Implementations must not block indefinitely; a congested or closed
    /// link reports an error and the caller moves on to the next candidate.
    fn push_message(&self, message: &Message) -> std::result::Result<(), LinkError>;
}

/// Shared handle to a link
pub type LinkHandle = Arc<dyn Link>;

/// Object identity of two link handles
///
/// Compares data pointers only, so two handles to the same link compare
/// equal even if they were coerced through different vtables.
pub fn same_link(a: &LinkHandle, b: &LinkHandle) -> bool {
    std::ptr::eq(
        Arc::as_ptr(a) as *const (),
        Arc::as_ptr(b) as *const (),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guid_hex() {
        let guid = Guid128::from_bytes([
            0x12, 0x34, 0x56, 0x78, 0x9a, 0xbc, 0xde, 0xf0, 0, 0, 0, 0, 0, 0, 0, 0,
        ]);
        assert!(guid.to_hex().starts_with("123456789abcdef0"));
        assert_eq!(guid.to_hex().len(), 32);
        assert_eq!(guid.to_short_string(), "12345678");
    }

    #[test]
    fn test_guid_random_distinct() {
        assert_ne!(Guid128::random(), Guid128::random());
    }

    #[test]
    fn test_same_link_identity() {
        let guid = Guid128::random();
        let (a, _rx_a) = QueueLink::new(":b2b.1", guid, 4);
        let (b, _rx_b) = QueueLink::new(":b2b.1", guid, 4);
        let a: LinkHandle = a;
        let b: LinkHandle = b;
        let a2 = Arc::clone(&a);

        assert!(same_link(&a, &a2));
        assert!(!same_link(&a, &b));
    }
}
