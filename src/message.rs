//! Bus messages as seen by the routing core
//!
//! The core never inspects a message beyond its destination and session id;
//! everything else is carried through to the link unchanged.

use crate::session::SessionId;

/// Kind of bus message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    /// A method call
    MethodCall,
    /// A reply to a method call
    MethodReturn,
    /// An error reply
    Error,
    /// A signal
    Signal,
}

/// An outgoing bus message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    message_type: MessageType,
    serial: u32,
    sender: String,
    destination: String,
    session_id: SessionId,
    member: Option<String>,
    body: Vec<u8>,
}

impl Message {
    /// Create a message of the given type
    pub fn new(
        message_type: MessageType,
        serial: u32,
        sender: impl Into<String>,
        destination: impl Into<String>,
    ) -> Self {
        Self {
            message_type,
            serial,
            sender: sender.into(),
            destination: destination.into(),
            session_id: SessionId::DEFAULT,
            member: None,
            body: Vec::new(),
        }
    }

    /// Create a method call
    pub fn method_call(
        serial: u32,
        sender: impl Into<String>,
        destination: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self::new(MessageType::MethodCall, serial, sender, destination).with_member(member)
    }

    /// Create a signal
    pub fn signal(
        serial: u32,
        sender: impl Into<String>,
        destination: impl Into<String>,
        member: impl Into<String>,
    ) -> Self {
        Self::new(MessageType::Signal, serial, sender, destination).with_member(member)
    }

    /// Set the session this message travels in
    pub fn with_session(mut self, session_id: SessionId) -> Self {
        self.session_id = session_id;
        self
    }

    /// Set the member name
    pub fn with_member(mut self, member: impl Into<String>) -> Self {
        self.member = Some(member.into());
        self
    }

    /// Set the marshalled body
    pub fn with_body(mut self, body: Vec<u8>) -> Self {
        self.body = body;
        self
    }

    /// Kind of message
    pub fn message_type(&self) -> MessageType {
        self.message_type
    }

    /// Serial number assigned by the sender
    pub fn serial(&self) -> u32 {
        self.serial
    }

    /// Unique name of the sender
    pub fn sender(&self) -> &str {
        &self.sender
    }

    /// Unique name of the destination
    pub fn destination(&self) -> &str {
        &self.destination
    }

    /// Session the message travels in (0 outside any session)
    pub fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Method or signal name, if any
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }

    /// Marshalled body
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}
