//! Individual connection handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::event::ServerEvent;

/// Unique connection identifier.
pub type ConnectionId = Uuid;

/// A handle to a single live connection.
///
/// Holds the sender half of the connection's outbound channel plus metadata
/// about the connected user. Sends to a dead or saturated connection are
/// silent no-ops.
#[derive(Debug)]
pub struct ConnectionHandle {
    /// Unique connection ID.
    pub id: ConnectionId,
    /// User who owns this connection.
    pub user_id: Uuid,
    /// Session this connection belongs to.
    pub session_id: Uuid,
    /// Username (cached for logging).
    pub username: String,
    /// Sender for outbound events.
    sender: mpsc::Sender<ServerEvent>,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Last pong received.
    pub last_pong: tokio::sync::RwLock<DateTime<Utc>>,
    /// Whether the connection is still alive.
    alive: AtomicBool,
}

impl ConnectionHandle {
    /// Create a new connection handle.
    pub fn new(
        user_id: Uuid,
        session_id: Uuid,
        username: String,
        sender: mpsc::Sender<ServerEvent>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            session_id,
            username,
            sender,
            connected_at: now,
            last_pong: tokio::sync::RwLock::new(now),
            alive: AtomicBool::new(true),
        }
    }

    /// Send an event to this connection. Returns false when the event was
    /// dropped (connection dead or its buffer full).
    pub fn send(&self, event: ServerEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(conn_id = %self.id, "Send buffer full, dropping event");
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_dead();
                false
            }
        }
    }

    /// Check if the connection is alive.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the connection as dead.
    pub fn mark_dead(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Record a pong response.
    pub async fn record_pong(&self) {
        let mut lp = self.last_pong.write().await;
        *lp = Utc::now();
    }
}
