//! Presence registry — the single source of truth for "who is online".
//!
//! An identity is online while at least one of its connections is
//! registered. The registry keeps a connection set per identity, so a
//! second tab neither replaces the first nor flips the user offline when it
//! closes. Instances are injected into the components that need them; there
//! is no ambient global.

use std::collections::HashSet;

use dashmap::DashMap;
use uuid::Uuid;

use crate::connection::handle::ConnectionId;

/// Result of registering a connection for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterOutcome {
    /// First connection: the identity just came online.
    CameOnline,
    /// The identity already had at least one live connection.
    AlreadyOnline,
}

/// Result of unregistering a connection for an identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnregisterOutcome {
    /// Last connection removed: the identity just went offline.
    WentOffline,
    /// Other connections remain; the identity stays online.
    StillOnline,
    /// The connection was not registered for this identity.
    NotRegistered,
}

/// Maps identities to their live connection handles.
#[derive(Debug, Default)]
pub struct PresenceRegistry {
    connections: DashMap<Uuid, HashSet<ConnectionId>>,
}

impl PresenceRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a connection for the identity.
    pub fn register(&self, user_id: Uuid, conn_id: ConnectionId) -> RegisterOutcome {
        let mut entry = self.connections.entry(user_id).or_default();
        let was_empty = entry.is_empty();
        entry.insert(conn_id);
        if was_empty {
            RegisterOutcome::CameOnline
        } else {
            RegisterOutcome::AlreadyOnline
        }
    }

    /// Removes a connection for the identity.
    pub fn unregister(&self, user_id: Uuid, conn_id: ConnectionId) -> UnregisterOutcome {
        let Some(mut entry) = self.connections.get_mut(&user_id) else {
            return UnregisterOutcome::NotRegistered;
        };
        if !entry.remove(&conn_id) {
            return UnregisterOutcome::NotRegistered;
        }
        if entry.is_empty() {
            drop(entry);
            self.connections.remove(&user_id);
            UnregisterOutcome::WentOffline
        } else {
            UnregisterOutcome::StillOnline
        }
    }

    /// Whether the identity has at least one live connection.
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.connections
            .get(&user_id)
            .map(|set| !set.is_empty())
            .unwrap_or(false)
    }

    /// All currently-online identities.
    pub fn snapshot(&self) -> Vec<Uuid> {
        self.connections.iter().map(|entry| *entry.key()).collect()
    }

    /// Live connection IDs for an identity.
    pub fn connections_of(&self, user_id: Uuid) -> Vec<ConnectionId> {
        self.connections
            .get(&user_id)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Number of online identities.
    pub fn online_count(&self) -> usize {
        self.connections.len()
    }
}
