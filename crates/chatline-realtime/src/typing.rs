//! Ephemeral typing signal relay.
//!
//! Signals are relayed verbatim to the conversation room, excluding the
//! originating connection. Nothing is persisted, queued, or acknowledged;
//! the client synthesizes a stop after its own inactivity window.

use std::sync::Arc;

use uuid::Uuid;

use crate::connection::handle::ConnectionId;
use crate::connection::manager::ConnectionManager;
use crate::event::ServerEvent;
use crate::room::router::Room;

/// Relays typing start/stop events to conversation rooms.
pub struct TypingBroadcaster {
    connections: Arc<ConnectionManager>,
}

impl std::fmt::Debug for TypingBroadcaster {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingBroadcaster").finish()
    }
}

impl TypingBroadcaster {
    /// Creates a new typing broadcaster.
    pub fn new(connections: Arc<ConnectionManager>) -> Self {
        Self { connections }
    }

    /// Relays a typing-started signal.
    pub fn relay_start(&self, origin: ConnectionId, sender_id: Uuid, conversation_id: Uuid) {
        self.connections.broadcast_room(
            &Room::Conversation(conversation_id),
            &ServerEvent::TypingStart {
                conversation_id,
                sender_id,
            },
            Some(origin),
        );
    }

    /// Relays a typing-stopped signal.
    pub fn relay_stop(&self, origin: ConnectionId, sender_id: Uuid, conversation_id: Uuid) {
        self.connections.broadcast_room(
            &Room::Conversation(conversation_id),
            &ServerEvent::TypingStop {
                conversation_id,
                sender_id,
            },
            Some(origin),
        );
    }
}
