//! Connection manager — connection lifecycle and event fan-out.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use uuid::Uuid;

use chatline_core::config::realtime::RealtimeConfig;
use chatline_database::store::UserStore;

use crate::event::ServerEvent;
use crate::metrics::RealtimeMetrics;
use crate::presence::registry::{PresenceRegistry, RegisterOutcome, UnregisterOutcome};
use crate::room::router::{Room, RoomRouter};

use super::handle::{ConnectionHandle, ConnectionId};
use super::pool::ConnectionPool;

/// Manages all active connections: registration, teardown, and every
/// outbound send path (direct, per-user, per-room, global).
pub struct ConnectionManager {
    /// Connection pool.
    pool: Arc<ConnectionPool>,
    /// Room membership tables.
    rooms: Arc<RoomRouter>,
    /// Presence registry.
    presence: Arc<PresenceRegistry>,
    /// User store, for best-effort presence persistence.
    users: Arc<dyn UserStore>,
    /// Metrics.
    metrics: Arc<RealtimeMetrics>,
    /// Configuration.
    config: RealtimeConfig,
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager").finish()
    }
}

impl ConnectionManager {
    /// Creates a new connection manager.
    pub fn new(
        config: RealtimeConfig,
        pool: Arc<ConnectionPool>,
        rooms: Arc<RoomRouter>,
        presence: Arc<PresenceRegistry>,
        users: Arc<dyn UserStore>,
        metrics: Arc<RealtimeMetrics>,
    ) -> Self {
        Self {
            pool,
            rooms,
            presence,
            users,
            metrics,
            config,
        }
    }

    /// Registers a new authenticated connection.
    ///
    /// Joins the personal room, updates the presence registry, broadcasts
    /// `presence-online` when this is the identity's first connection, and
    /// pushes the full presence snapshot to the fresh connection so it need
    /// not wait for incremental events.
    ///
    /// Returns the connection handle and the receiver for outbound events.
    pub async fn register(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        username: String,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.config.channel_buffer_size);
        let handle = Arc::new(ConnectionHandle::new(user_id, session_id, username, tx));

        self.pool.add(handle.clone());
        self.rooms.join_personal(handle.id, user_id);
        let outcome = self.presence.register(user_id, handle.id);

        if outcome == RegisterOutcome::CameOnline {
            self.persist_presence(user_id, true);
            self.broadcast_all(&ServerEvent::PresenceOnline { user_id }).await;
        }

        handle.send(ServerEvent::PresenceSnapshot {
            user_ids: self.presence.snapshot(),
        });

        self.metrics.connection_opened();

        info!(
            conn_id = %handle.id,
            user_id = %user_id,
            session_id = %session_id,
            "Connection registered"
        );

        (handle, rx)
    }

    /// Unregisters a connection and cleans up all of its memberships.
    ///
    /// Removal from rooms and the presence registry happens synchronously,
    /// before any further event for the identity can be processed, so no
    /// notification is routed to a dead handle.
    pub async fn unregister(&self, conn_id: &ConnectionId) {
        let Some(handle) = self.pool.remove(conn_id) else {
            return;
        };
        handle.mark_dead();

        self.rooms.remove_connection(*conn_id, handle.user_id);
        let outcome = self.presence.unregister(handle.user_id, *conn_id);

        if outcome == UnregisterOutcome::WentOffline {
            let last_seen_at = Utc::now();
            self.persist_offline(handle.user_id, last_seen_at);
            self.broadcast_all(&ServerEvent::PresenceOffline {
                user_id: handle.user_id,
                last_seen_at,
            })
            .await;
        }

        self.metrics.connection_closed();

        info!(
            conn_id = %conn_id,
            user_id = %handle.user_id,
            "Connection unregistered"
        );
    }

    /// Looks up a live connection handle.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.pool.get(conn_id)
    }

    /// Whether the identity currently has at least one live connection.
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.presence.is_online(user_id)
    }

    /// Sends an event to one connection. A dead target is a silent no-op.
    pub fn send_to_connection(&self, conn_id: &ConnectionId, event: &ServerEvent) {
        if let Some(handle) = self.pool.get(conn_id) {
            if handle.send(event.clone()) {
                self.metrics.events_sent(1);
            }
        }
    }

    /// Sends an event to every connection of an identity.
    pub fn send_to_user(&self, user_id: Uuid, event: &ServerEvent) {
        let mut sent = 0u64;
        for conn_id in self.presence.connections_of(user_id) {
            if let Some(handle) = self.pool.get(&conn_id) {
                if handle.send(event.clone()) {
                    sent += 1;
                }
            }
        }
        self.metrics.events_sent(sent);
    }

    /// Broadcasts an event to the members of several rooms, delivering at
    /// most once per connection even when a connection is a member of more
    /// than one of them. `exclude` skips the originating connection.
    pub fn broadcast_rooms(
        &self,
        rooms: &[Room],
        event: &ServerEvent,
        exclude: Option<ConnectionId>,
    ) {
        let mut targets: HashSet<ConnectionId> = HashSet::new();
        for room in rooms {
            targets.extend(self.rooms.members(room));
        }
        if let Some(origin) = exclude {
            targets.remove(&origin);
        }

        let mut sent = 0u64;
        for conn_id in targets {
            if let Some(handle) = self.pool.get(&conn_id) {
                if handle.send(event.clone()) {
                    sent += 1;
                }
            }
        }
        self.metrics.events_sent(sent);
    }

    /// Broadcasts an event to a single room.
    pub fn broadcast_room(&self, room: &Room, event: &ServerEvent, exclude: Option<ConnectionId>) {
        self.broadcast_rooms(std::slice::from_ref(room), event, exclude);
    }

    /// Broadcasts an event to every connection.
    pub async fn broadcast_all(&self, event: &ServerEvent) {
        let all = self.pool.all_connections();
        let mut sent = 0u64;
        for handle in &all {
            if handle.send(event.clone()) {
                sent += 1;
            }
        }
        self.metrics.events_sent(sent);
    }

    /// Closes every connection. Used during shutdown.
    pub async fn close_all(&self) {
        let all = self.pool.all_connections();
        for handle in &all {
            handle.mark_dead();
            self.pool.remove(&handle.id);
        }
        info!(count = all.len(), "All connections closed");
    }

    /// Returns the total connection count.
    pub fn connection_count(&self) -> usize {
        self.pool.connection_count()
    }

    /// Best-effort persistence of the online flag. Failures are logged and
    /// swallowed; they must never break the connection-handling path.
    fn persist_presence(&self, user_id: Uuid, online: bool) {
        let users = self.users.clone();
        tokio::spawn(async move {
            if let Err(e) = users.set_presence(user_id, online, None).await {
                warn!(user_id = %user_id, error = %e, "Failed to persist online flag");
            }
        });
    }

    /// Best-effort persistence of offline status and last-seen timestamp.
    fn persist_offline(&self, user_id: Uuid, last_seen_at: chrono::DateTime<Utc>) {
        let users = self.users.clone();
        tokio::spawn(async move {
            if let Err(e) = users.set_presence(user_id, false, Some(last_seen_at)).await {
                warn!(user_id = %user_id, error = %e, "Failed to persist last-seen timestamp");
            }
        });
    }
}
