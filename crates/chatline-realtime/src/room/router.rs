//! Room router — logical broadcast groups.
//!
//! Every connection is a member of exactly one personal room for its entire
//! lifetime, and of at most one conversation room at a time. Joining a new
//! conversation room implicitly leaves the previous one; this is a stated
//! invariant of the router, not incidental behavior — reconnection logic
//! depends on it.

use std::collections::HashSet;
use std::fmt;

use dashmap::DashMap;
use uuid::Uuid;

use crate::connection::handle::ConnectionId;

/// A logical broadcast group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Room {
    /// Per-user notification channel, keyed by identity.
    User(Uuid),
    /// Per-conversation channel ("currently viewing"), keyed by
    /// conversation id.
    Conversation(Uuid),
}

impl fmt::Display for Room {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Room::User(id) => write!(f, "user:{id}"),
            Room::Conversation(id) => write!(f, "conversation:{id}"),
        }
    }
}

/// Membership tables for all rooms.
#[derive(Debug, Default)]
pub struct RoomRouter {
    /// Room → member connection IDs.
    members: DashMap<Room, HashSet<ConnectionId>>,
    /// Connection → its current conversation room, if any.
    active_conversation: DashMap<ConnectionId, Uuid>,
}

impl RoomRouter {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the connection to its personal room.
    pub fn join_personal(&self, conn_id: ConnectionId, user_id: Uuid) {
        self.members
            .entry(Room::User(user_id))
            .or_default()
            .insert(conn_id);
    }

    /// Adds the connection to a conversation room, leaving any previously
    /// joined conversation room first. Returns the conversation that was
    /// left, if any.
    pub fn join_conversation(&self, conn_id: ConnectionId, conversation_id: Uuid) -> Option<Uuid> {
        let previous = self
            .active_conversation
            .get(&conn_id)
            .map(|entry| *entry.value())
            .filter(|prev| *prev != conversation_id);

        if let Some(prev) = previous {
            self.remove_member(Room::Conversation(prev), conn_id);
        }

        self.members
            .entry(Room::Conversation(conversation_id))
            .or_default()
            .insert(conn_id);
        self.active_conversation.insert(conn_id, conversation_id);

        previous
    }

    /// Removes the connection from a conversation room. Returns whether the
    /// connection was a member.
    pub fn leave_conversation(&self, conn_id: ConnectionId, conversation_id: Uuid) -> bool {
        let was_member = self.remove_member(Room::Conversation(conversation_id), conn_id);
        if was_member {
            self.active_conversation
                .remove_if(&conn_id, |_, current| *current == conversation_id);
        }
        was_member
    }

    /// The conversation room the connection is currently in, if any.
    pub fn active_conversation(&self, conn_id: ConnectionId) -> Option<Uuid> {
        self.active_conversation
            .get(&conn_id)
            .map(|entry| *entry.value())
    }

    /// Member connection IDs of a room. Unknown rooms are empty.
    pub fn members(&self, room: &Room) -> Vec<ConnectionId> {
        self.members
            .get(room)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Removes the connection from every room it belongs to. Called on
    /// disconnect, before any further event for the identity is processed.
    pub fn remove_connection(&self, conn_id: ConnectionId, user_id: Uuid) {
        self.remove_member(Room::User(user_id), conn_id);
        if let Some((_, conversation_id)) = self.active_conversation.remove(&conn_id) {
            self.remove_member(Room::Conversation(conversation_id), conn_id);
        }
    }

    /// Number of rooms with at least one member.
    pub fn room_count(&self) -> usize {
        self.members.len()
    }

    fn remove_member(&self, room: Room, conn_id: ConnectionId) -> bool {
        let Some(mut entry) = self.members.get_mut(&room) else {
            return false;
        };
        let removed = entry.remove(&conn_id);
        if entry.is_empty() {
            drop(entry);
            self.members.remove(&room);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joining_a_conversation_evicts_the_previous_one() {
        let router = RoomRouter::new();
        let conn = Uuid::new_v4();
        let first = Uuid::new_v4();
        let second = Uuid::new_v4();

        assert_eq!(router.join_conversation(conn, first), None);
        assert_eq!(router.join_conversation(conn, second), Some(first));

        assert!(router.members(&Room::Conversation(first)).is_empty());
        assert_eq!(router.members(&Room::Conversation(second)), vec![conn]);
        assert_eq!(router.active_conversation(conn), Some(second));
    }

    #[test]
    fn rejoining_the_same_conversation_is_a_no_op() {
        let router = RoomRouter::new();
        let conn = Uuid::new_v4();
        let conversation = Uuid::new_v4();

        router.join_conversation(conn, conversation);
        assert_eq!(router.join_conversation(conn, conversation), None);
        assert_eq!(router.members(&Room::Conversation(conversation)), vec![conn]);
    }

    #[test]
    fn personal_room_survives_conversation_switches() {
        let router = RoomRouter::new();
        let conn = Uuid::new_v4();
        let user = Uuid::new_v4();

        router.join_personal(conn, user);
        router.join_conversation(conn, Uuid::new_v4());
        router.join_conversation(conn, Uuid::new_v4());

        assert_eq!(router.members(&Room::User(user)), vec![conn]);
    }

    #[test]
    fn remove_connection_clears_all_memberships() {
        let router = RoomRouter::new();
        let conn = Uuid::new_v4();
        let user = Uuid::new_v4();
        let conversation = Uuid::new_v4();

        router.join_personal(conn, user);
        router.join_conversation(conn, conversation);
        router.remove_connection(conn, user);

        assert!(router.members(&Room::User(user)).is_empty());
        assert!(router.members(&Room::Conversation(conversation)).is_empty());
        assert_eq!(router.active_conversation(conn), None);
        assert_eq!(router.room_count(), 0);
    }

    #[test]
    fn leave_requires_membership() {
        let router = RoomRouter::new();
        let conn = Uuid::new_v4();
        let conversation = Uuid::new_v4();

        assert!(!router.leave_conversation(conn, conversation));
        router.join_conversation(conn, conversation);
        assert!(router.leave_conversation(conn, conversation));
        assert_eq!(router.active_conversation(conn), None);
    }
}
