use crate::{ConnectionId, SessionId};
use std::collections::{HashMap, HashSet};

/// Tracks which connections belong to which session. Pure bookkeeping:
/// no I/O, no knowledge of transports. A session entry exists exactly as
/// long as it has at least one member; the empty entry is removed on the
/// spot, so `sessions` never holds an empty set.
pub struct SessionRegistry {
    sessions: HashMap<SessionId, HashSet<ConnectionId>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
        }
    }

    /// Adds `connection_id` to the session, creating the entry on first
    /// join. Idempotent per connection. Membership in any *other* session
    /// is untouched; the caller is responsible for leaving it first.
    pub fn join(&mut self, session_id: &SessionId, connection_id: ConnectionId) {
        let members = self
            .sessions
            .entry(session_id.clone())
            .or_insert_with(HashSet::new);
        if members.insert(connection_id) {
            log::info!("Connection {} joined session {}", connection_id, session_id);
        }
    }

    /// Removes `connection_id` from the session, dropping the session
    /// entry once its member set empties. Unknown session or membership
    /// is a no-op; close paths race with earlier cleanup and must be
    /// tolerated.
    pub fn leave(&mut self, session_id: &SessionId, connection_id: ConnectionId) {
        if let Some(members) = self.sessions.get_mut(session_id) {
            if members.remove(&connection_id) {
                log::info!("Connection {} left session {}", connection_id, session_id);
            }
            if members.is_empty() {
                self.sessions.remove(session_id);
            }
        }
    }

    /// Every member of the session except `exclude`. Empty for an unknown
    /// session; a drawing event addressed to an expired session is simply
    /// dropped by the caller.
    pub fn broadcast_targets<'a>(
        &'a self,
        session_id: &SessionId,
        exclude: ConnectionId,
    ) -> impl Iterator<Item = ConnectionId> + 'a {
        self.sessions
            .get(session_id)
            .into_iter()
            .flatten()
            .copied()
            .filter(move |id| *id != exclude)
    }

    pub fn has_session(&self, session_id: &SessionId) -> bool {
        self.sessions.contains_key(session_id)
    }

    pub fn member_count(&self, session_id: &SessionId) -> usize {
        self.sessions.get(session_id).map_or(0, |s| s.len())
    }
}
