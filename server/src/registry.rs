//! Registry of sessions that have entered the join handshake
//!
//! The registry is the single source of truth for who is connected. It is
//! owned by the lifecycle controller, which alone adds and removes entries;
//! fan-out and roster building only read it.

use crate::session::Session;
use log::info;
use std::collections::HashMap;
use worldsync_shared::{RosterEntry, SessionId};

/// Sessions indexed by their identifier
///
/// Entries are inserted when a session sends `ready` and stay until the
/// session is closed. Iteration order is unspecified.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a session under its identifier
    ///
    /// Returns false and leaves the registry untouched if the identifier is
    /// already present, so a session can never appear twice.
    pub fn add(&mut self, session: Session) -> bool {
        if self.sessions.contains_key(&session.id) {
            return false;
        }
        info!("[session #{}] registered", session.id);
        self.sessions.insert(session.id, session);
        true
    }

    /// Removes a session, handing it back to the caller
    ///
    /// Removing an absent identifier is a no-op returning `None`. A session
    /// may be closed by a timeout and by its own disconnect at nearly the same
    /// moment; only the first removal observes it.
    pub fn remove(&mut self, id: SessionId) -> Option<Session> {
        self.sessions.remove(&id)
    }

    pub fn get(&self, id: SessionId) -> Option<&Session> {
        self.sessions.get(&id)
    }

    pub fn get_mut(&mut self, id: SessionId) -> Option<&mut Session> {
        self.sessions.get_mut(&id)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Point-in-time view of every registered session for fan-out iteration
    pub fn snapshot(&self) -> Vec<(SessionId, &Session)> {
        self.sessions.iter().map(|(id, session)| (*id, session)).collect()
    }

    /// Entity states of all prepared sessions, ordered by identifier
    pub fn roster(&self) -> Vec<RosterEntry> {
        let mut roster: Vec<RosterEntry> = self
            .sessions
            .values()
            .filter(|session| session.is_prepared())
            .map(Session::roster_entry)
            .collect();
        roster.sort_by_key(|entry| entry.uuid);
        roster
    }

    pub fn prepared_count(&self) -> usize {
        self.sessions.values().filter(|s| s.is_prepared()).count()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
