//! Session identifiers and session-related types
//!
//! A session is a multi-party communication context identified by a 32-bit
//! id. Id `0` is reserved for the default route, the direct path to a remote
//! daemon that is not tied to any particular session.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a multi-party session
///
/// `SessionId::DEFAULT` (0) selects the direct, non-session route.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct SessionId(u32);

impl SessionId {
    /// The default route key
    pub const DEFAULT: SessionId = SessionId(0);

    /// Wrap a raw session id
    pub const fn new(id: u32) -> Self {
        Self(id)
    }

    /// Raw numeric value
    pub const fn get(self) -> u32 {
        self.0
    }

    /// True for the reserved default-route id
    pub const fn is_default(self) -> bool {
        self.0 == 0
    }
}

impl From<u32> for SessionId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl From<SessionId> for u32 {
    fn from(id: SessionId) -> Self {
        id.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of traffic a session carries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TrafficType {
    /// Bus messages
    #[default]
    Messages,
    /// Unreliable raw byte stream
    RawUnreliable,
    /// Reliable raw byte stream
    RawReliable,
}

/// Preferred options for a session, handed to link selection
///
/// Compatibility matching between options is negotiated elsewhere; the
/// routing core only carries these through to the active `LinkSelector`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionOpts {
    /// Traffic carried by the session
    pub traffic: TrafficType,
    /// Whether the session may have more than two members
    pub is_multipoint: bool,
    /// Proximity mask
    pub proximity: u8,
    /// Transport mask
    pub transports: u16,
}

impl Default for SessionOpts {
    fn default() -> Self {
        Self {
            traffic: TrafficType::Messages,
            is_multipoint: false,
            proximity: 0xFF,
            transports: 0xFFFF,
        }
    }
}

/// Reason a session was lost, reported to subscribers when a link drops
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum SessionLostReason {
    /// Invalid
    Invalid = 0x00,
    /// Remote end left the session
    RemoteEndLeftSession = 0x01,
    /// Remote end closed abruptly
    RemoteEndClosedAbruptly = 0x02,
    /// Session binder removed this member
    RemovedByBinder = 0x03,
    /// The link timed out
    LinkTimeout = 0x04,
    /// Unspecified
    ReasonOther = 0x05,
}
