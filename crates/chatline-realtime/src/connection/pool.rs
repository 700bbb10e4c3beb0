//! Connection pool — direct lookup of live connection handles.
//!
//! The per-user index lives in [`crate::presence::registry::PresenceRegistry`],
//! which owns the "who is online" question; the pool only answers
//! "which handle belongs to this connection id".

use std::sync::Arc;

use dashmap::DashMap;

use super::handle::{ConnectionHandle, ConnectionId};

/// Thread-safe pool of all active connections.
#[derive(Debug, Default)]
pub struct ConnectionPool {
    /// Connection ID → connection handle.
    by_id: DashMap<ConnectionId, Arc<ConnectionHandle>>,
}

impl ConnectionPool {
    /// Creates a new empty connection pool.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a connection to the pool.
    pub fn add(&self, handle: Arc<ConnectionHandle>) {
        self.by_id.insert(handle.id, handle);
    }

    /// Removes a connection from the pool, returning its handle.
    pub fn remove(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.remove(conn_id).map(|(_, handle)| handle)
    }

    /// Gets a specific connection by ID.
    pub fn get(&self, conn_id: &ConnectionId) -> Option<Arc<ConnectionHandle>> {
        self.by_id.get(conn_id).map(|entry| entry.value().clone())
    }

    /// Returns the total number of active connections.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns all connection handles.
    pub fn all_connections(&self) -> Vec<Arc<ConnectionHandle>> {
        self.by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }
}
