//! Link selection for session binding
//!
//! When a session is bound without naming a link, the endpoint asks its
//! `LinkSelector` to pick one from the route table. The selector runs under
//! the endpoint's lock and must not block.

use crate::link::LinkHandle;
use crate::routing::route_table::RouteTable;
use crate::session::{SessionId, SessionOpts};

/// Strategy choosing a link for a new session binding
pub trait LinkSelector: Send + Sync {
    /// Pick a link from `routes` for `session_id`, or `None` if nothing fits
    fn select(
        &self,
        routes: &RouteTable,
        session_id: SessionId,
        opts: Option<&SessionOpts>,
    ) -> Option<LinkHandle>;
}

/// Prefer a link already carrying the session, else the first direct path
///
/// Ignores session options and path cost; among several direct paths the
/// first inserted wins.
#[derive(Debug, Clone, Copy, Default)]
pub struct FirstAvailable;

impl LinkSelector for FirstAvailable {
    fn select(
        &self,
        routes: &RouteTable,
        session_id: SessionId,
        _opts: Option<&SessionOpts>,
    ) -> Option<LinkHandle> {
        // TODO: choose by hop count and session option compatibility once
        // those are exchanged with neighbors.
        routes
            .first_bound(session_id)
            .0
            .or_else(|| routes.direct_links().first().cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::{same_link, Guid128, QueueLink};
    use std::sync::Arc;

    fn link(name: &str) -> LinkHandle {
        let (link, _rx) = QueueLink::new(name, Guid128::random(), 8);
        link
    }

    #[test]
    fn test_empty_table_selects_nothing() {
        let table = RouteTable::new();
        assert!(FirstAvailable
            .select(&table, SessionId::new(1), None)
            .is_none());
    }

    #[test]
    fn test_first_direct_path_wins() {
        let l1 = link(":b2b.1");
        let l2 = link(":b2b.2");
        let mut table = RouteTable::with_direct(Arc::clone(&l1));
        table.insert_direct(Arc::clone(&l2));

        let chosen = FirstAvailable
            .select(&table, SessionId::new(4), Some(&SessionOpts::default()))
            .unwrap();
        assert!(same_link(&chosen, &l1));
    }

    #[test]
    fn test_existing_session_binding_preferred() {
        let l1 = link(":b2b.1");
        let l2 = link(":b2b.2");
        let mut table = RouteTable::with_direct(Arc::clone(&l1));
        table.insert_direct(Arc::clone(&l2));
        table.bind_session(SessionId::new(4), Arc::clone(&l2));

        let chosen = FirstAvailable
            .select(&table, SessionId::new(4), None)
            .unwrap();
        assert!(same_link(&chosen, &l2));
    }
}
