use relay::{ConnectionId, SessionId, SessionRegistry};
use std::collections::HashMap;
use std::num::Wrapping;

/// A connection's two-state membership lifecycle: unjoined from the moment
/// the socket opens until its first join message, then joined to exactly
/// one session until it switches or disconnects.
#[derive(Debug, Clone, PartialEq)]
pub enum Membership {
    Unjoined,
    Joined(SessionId),
}

pub struct ServerState {
    connection_id_source: Wrapping<ConnectionId>,
    memberships: HashMap<ConnectionId, Membership>,
    pub registry: SessionRegistry,
}

impl ServerState {
    pub fn new() -> Self {
        Self {
            connection_id_source: Wrapping(0),
            memberships: HashMap::new(),
            registry: SessionRegistry::new(),
        }
    }

    pub fn create_connection(&mut self) -> ConnectionId {
        let connection_id = self.new_connection_id();
        self.memberships.insert(connection_id, Membership::Unjoined);
        connection_id
    }

    /// Records `session_id` as the connection's current session. A join
    /// naming a different session while already joined leaves the old one
    /// first, so a connection is a member of at most one session at any
    /// time. A repeated join of the same session is a no-op.
    pub fn join_session(&mut self, connection_id: ConnectionId, session_id: &SessionId) {
        match self.memberships.get(&connection_id) {
            Some(Membership::Joined(current)) if current == session_id => return,
            Some(Membership::Joined(current)) => {
                let old = current.clone();
                self.registry.leave(&old, connection_id);
            }
            Some(Membership::Unjoined) => {}
            None => return,
        }
        self.registry.join(session_id, connection_id);
        self.memberships
            .insert(connection_id, Membership::Joined(session_id.clone()));
    }

    pub fn current_session(&self, connection_id: ConnectionId) -> Option<&SessionId> {
        match self.memberships.get(&connection_id) {
            Some(Membership::Joined(session_id)) => Some(session_id),
            _ => None,
        }
    }

    /// Tears down the connection's membership entry, leaving its session
    /// if it had one. Tolerates connections that never joined anything and
    /// connections already removed by an earlier close path.
    pub fn disconnect(&mut self, connection_id: ConnectionId) {
        if let Some(Membership::Joined(session_id)) = self.memberships.remove(&connection_id) {
            self.registry.leave(&session_id, connection_id);
        }
    }

    fn new_connection_id(&mut self) -> ConnectionId {
        self.connection_id_source += Wrapping(1);
        self.connection_id_source.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    // An id the allocator never hands out, so excluding it filters nothing.
    const NOBODY: ConnectionId = 0;

    #[test]
    fn it_removes_session_when_all_connections_disconnect() {
        let mut state = ServerState::new();
        let a = state.create_connection();
        let b = state.create_connection();
        state.join_session(a, &"room1".to_string());
        state.join_session(b, &"room1".to_string());
        state.disconnect(a);
        assert!(state.registry.has_session(&"room1".to_string()));
        state.disconnect(b);
        assert!(!state.registry.has_session(&"room1".to_string()));
    }

    #[test]
    fn it_leaves_old_session_when_switching() {
        let mut state = ServerState::new();
        let a = state.create_connection();
        let b = state.create_connection();
        state.join_session(a, &"room1".to_string());
        state.join_session(b, &"room1".to_string());
        state.join_session(a, &"room2".to_string());
        assert_eq!(state.current_session(a), Some(&"room2".to_string()));
        let room1_members: Vec<_> = state
            .registry
            .broadcast_targets(&"room1".to_string(), NOBODY)
            .collect();
        assert_eq!(room1_members, vec![b]);
    }

    #[test]
    fn it_keeps_membership_on_repeated_join() {
        let mut state = ServerState::new();
        let a = state.create_connection();
        state.join_session(a, &"room1".to_string());
        state.join_session(a, &"room1".to_string());
        assert_eq!(state.registry.member_count(&"room1".to_string()), 1);
        assert_eq!(state.current_session(a), Some(&"room1".to_string()));
    }

    #[test]
    fn it_tolerates_disconnect_of_unjoined_connection() {
        let mut state = ServerState::new();
        let a = state.create_connection();
        state.disconnect(a);
        state.disconnect(a);
        assert_eq!(state.current_session(a), None);
    }

    proptest! {
        /// Over arbitrary join/disconnect interleavings, every connection
        /// is a member of at most one session, and that session matches
        /// its recorded membership.
        #[test]
        fn connection_is_member_of_at_most_one_session(
            ops in prop::collection::vec((any::<bool>(), 0..4usize, 0..3usize), 0..64)
        ) {
            let rooms = ["a".to_string(), "b".to_string(), "c".to_string()];
            let mut state = ServerState::new();
            let conns: Vec<ConnectionId> = (0..4).map(|_| state.create_connection()).collect();

            for (is_join, conn, room) in ops {
                if is_join {
                    state.join_session(conns[conn], &rooms[room]);
                } else {
                    state.disconnect(conns[conn]);
                }

                for &conn in &conns {
                    let rooms_containing: Vec<_> = rooms
                        .iter()
                        .filter(|room| {
                            state.registry.broadcast_targets(room, NOBODY).any(|id| id == conn)
                        })
                        .collect();
                    prop_assert!(rooms_containing.len() <= 1);
                    match state.current_session(conn) {
                        Some(session_id) => {
                            prop_assert_eq!(rooms_containing, vec![session_id])
                        }
                        None => prop_assert!(rooms_containing.is_empty()),
                    }
                }
            }
        }
    }
}
