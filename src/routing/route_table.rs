//! Route table for a virtual endpoint
//!
//! This module provides the session-keyed multi-map from session id to the
//! links that reach a virtual endpoint. Key `0` holds the direct paths; every
//! other key holds session bindings riding on one of those direct paths.
//!
//! The table owns the reference-count discipline: binding a session takes one
//! reference on the link and every removal of a session entry releases
//! exactly one. It is not synchronized itself; the owning endpoint's lock
//! guards every access.

use crate::link::{same_link, Guid128, LinkHandle};
use crate::session::SessionId;
use std::collections::{BTreeMap, BTreeSet};

/// Entries removed by `RouteTable::remove_link`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemovedRoutes {
    /// Number of zero-key entries removed
    pub direct: usize,
    /// Session ids whose entries were removed (one reference released each)
    pub sessions: Vec<SessionId>,
}

impl RemovedRoutes {
    /// Total entries removed
    pub fn total(&self) -> usize {
        self.direct + self.sessions.len()
    }
}

/// Multi-map from session id to links, insertion-ordered within a key
#[derive(Default)]
pub struct RouteTable {
    /// Keys in ascending order, so the default route comes first
    routes: BTreeMap<SessionId, Vec<LinkHandle>>,
}

impl RouteTable {
    /// Create an empty route table
    pub fn new() -> Self {
        Self {
            routes: BTreeMap::new(),
        }
    }

    /// Create a table seeded with one direct path
    pub fn with_direct(link: LinkHandle) -> Self {
        let mut table = Self::new();
        table.routes.insert(SessionId::DEFAULT, vec![link]);
        table
    }

    /// Snapshot of every link under exactly `session_id`, in insertion order
    pub fn candidates(&self, session_id: SessionId) -> Vec<LinkHandle> {
        self.routes.get(&session_id).cloned().unwrap_or_default()
    }

    /// First link under `session_id` and the number of entries sharing that key
    pub fn first_bound(&self, session_id: SessionId) -> (Option<LinkHandle>, usize) {
        match self.routes.get(&session_id) {
            Some(bucket) => (bucket.first().cloned(), bucket.len()),
            None => (None, 0),
        }
    }

    /// Direct paths (zero-key entries)
    pub fn direct_links(&self) -> &[LinkHandle] {
        self.routes
            .get(&SessionId::DEFAULT)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Whether `link` is a direct path of this table
    pub fn has_direct(&self, link: &LinkHandle) -> bool {
        self.direct_links().iter().any(|l| same_link(l, link))
    }

    /// Add a direct path; returns false if this exact link is already one
    pub fn insert_direct(&mut self, link: LinkHandle) -> bool {
        if self.has_direct(&link) {
            return false;
        }
        self.routes.entry(SessionId::DEFAULT).or_default().push(link);
        true
    }

    /// Bind a session to a link that is already a direct path
    ///
    /// Takes one reference on the link. Returns false, with no change to the
    /// table or the link, if the link has no zero-key entry.
    pub fn bind_session(&mut self, session_id: SessionId, link: LinkHandle) -> bool {
        debug_assert!(!session_id.is_default());
        if !self.has_direct(&link) {
            return false;
        }
        link.increment_ref();
        self.routes.entry(session_id).or_default().push(link);
        true
    }

    /// Remove the first entry bound to `session_id`, releasing its reference
    pub fn unbind_session(&mut self, session_id: SessionId) -> Option<LinkHandle> {
        debug_assert!(!session_id.is_default());
        let bucket = self.routes.get_mut(&session_id)?;
        let link = bucket.remove(0);
        if bucket.is_empty() {
            self.routes.remove(&session_id);
        }
        link.decrement_ref();
        Some(link)
    }

    /// Remove every entry pointing at `link`
    ///
    /// Each removed session entry releases one reference; the direct entry
    /// releases none.
    pub fn remove_link(&mut self, link: &LinkHandle) -> RemovedRoutes {
        let mut removed = RemovedRoutes::default();

        for (session_id, bucket) in self.routes.iter_mut() {
            bucket.retain(|candidate| {
                if !same_link(candidate, link) {
                    return true;
                }
                if session_id.is_default() {
                    removed.direct += 1;
                } else {
                    candidate.decrement_ref();
                    removed.sessions.push(*session_id);
                }
                false
            });
        }
        self.routes.retain(|_, bucket| !bucket.is_empty());

        removed
    }

    /// Whether any entry exists under a non-zero key
    pub fn has_session_routes(&self) -> bool {
        self.routes.range(SessionId::new(1)..).next().is_some()
    }

    /// Whether any entry points at a link to the daemon `guid`
    pub fn reaches_guid(&self, guid: Guid128) -> bool {
        self.links().any(|l| l.remote_guid() == guid)
    }

    /// Whether any entry points at a link to a daemon other than `guid`
    pub fn can_route_without(&self, guid: Guid128) -> bool {
        self.links().any(|l| l.remote_guid() != guid)
    }

    /// Non-zero session ids bound to `link`
    pub fn session_ids_for(&self, link: &LinkHandle) -> BTreeSet<SessionId> {
        self.routes
            .range(SessionId::new(1)..)
            .filter(|(_, bucket)| bucket.iter().any(|l| same_link(l, link)))
            .map(|(session_id, _)| *session_id)
            .collect()
    }

    /// Whether any bound link's unique name appears in `names`
    pub fn has_link_named<I>(&self, names: I) -> bool
    where
        I: IntoIterator,
        I::Item: AsRef<str>,
    {
        names
            .into_iter()
            .any(|name| self.links().any(|l| l.unique_name() == name.as_ref()))
    }

    /// Every entry's link, in key order
    pub fn links(&self) -> impl Iterator<Item = &LinkHandle> {
        self.routes.values().flatten()
    }

    /// Total number of entries
    pub fn len(&self) -> usize {
        self.routes.values().map(Vec::len).sum()
    }

    /// Whether the table has no entries at all
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

impl Drop for RouteTable {
    fn drop(&mut self) {
        // Session entries still bound at drop hold references nobody else
        // will release.
        for (session_id, bucket) in self.routes.range(SessionId::new(1)..) {
            for link in bucket {
                tracing::debug!(
                    session = %session_id,
                    link = link.unique_name(),
                    "releasing session route on drop"
                );
                link.decrement_ref();
            }
        }
    }
}

impl std::fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut map = f.debug_map();
        for (session_id, bucket) in &self.routes {
            let names: Vec<&str> = bucket.iter().map(|l| l.unique_name()).collect();
            map.entry(session_id, &names);
        }
        map.finish()
    }
}
