//! Message delivery over a snapshot of candidate links
//!
//! Candidates are tried in order and delivery stops at the first link that
//! accepts the message. Callers build the snapshot under their route lock
//! and release it before calling in here.

use crate::link::LinkHandle;
use crate::message::Message;

/// Successful delivery
#[derive(Clone)]
pub struct Delivery {
    /// Link that accepted the message
    pub link: LinkHandle,
    /// Number of sends attempted, including the successful one
    pub attempts: usize,
}

impl std::fmt::Debug for Delivery {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Delivery")
            .field("link", &self.link.unique_name())
            .field("attempts", &self.attempts)
            .finish()
    }
}

/// Try each candidate in order until one accepts `message`
///
/// Returns the accepting link, or the number of failed attempts if none
/// did (zero for an empty snapshot).
pub fn deliver(candidates: &[LinkHandle], message: &Message) -> Result<Delivery, usize> {
    for (index, link) in candidates.iter().enumerate() {
        match link.push_message(message) {
            Ok(()) => {
                return Ok(Delivery {
                    link: LinkHandle::clone(link),
                    attempts: index + 1,
                });
            },
            Err(e) => {
                tracing::debug!(
                    link = link.unique_name(),
                    serial = message.serial(),
                    error = %e,
                    "link refused message, trying next candidate"
                );
            },
        }
    }
    Err(candidates.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{same_link, Guid128, Link, QueueLink};

    fn test_message() -> Message {
        Message::method_call(7, ":local.1", ":remote.2", "Ping")
    }

    #[test]
    fn test_empty_snapshot_fails_without_attempts() {
        assert_eq!(deliver(&[], &test_message()).unwrap_err(), 0);
    }

    #[test]
    fn test_skips_closed_link() {
        let (closed, closed_rx) = QueueLink::new(":b2b.1", Guid128::random(), 4);
        drop(closed_rx);
        let (open, mut open_rx) = QueueLink::new(":b2b.2", Guid128::random(), 4);
        let candidates: Vec<LinkHandle> = vec![closed as LinkHandle, open.clone() as LinkHandle];

        let delivery = deliver(&candidates, &test_message()).unwrap();

        assert_eq!(delivery.attempts, 2);
        assert!(same_link(&delivery.link, &(open as LinkHandle)));
        assert_eq!(open_rx.try_recv().unwrap().serial(), 7);
    }

    #[test]
    fn test_all_failing_reports_attempts() {
        let (a, _a_rx) = QueueLink::new(":b2b.1", Guid128::random(), 1);
        let (b, b_rx) = QueueLink::new(":b2b.2", Guid128::random(), 1);
        drop(b_rx);
        a.push_message(&test_message()).unwrap();
        let candidates: Vec<LinkHandle> = vec![a as LinkHandle, b as LinkHandle];

        assert_eq!(deliver(&candidates, &test_message()).unwrap_err(), 2);
    }
}
