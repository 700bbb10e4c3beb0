//! Lightweight realtime metrics.

use std::sync::atomic::{AtomicU64, Ordering};

use serde::Serialize;

/// Atomic counters for the realtime engine.
#[derive(Debug, Default)]
pub struct RealtimeMetrics {
    connections_opened: AtomicU64,
    connections_closed: AtomicU64,
    events_received: AtomicU64,
    events_sent: AtomicU64,
}

/// Point-in-time metrics snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    /// Total connections opened since start.
    pub connections_opened: u64,
    /// Total connections closed since start.
    pub connections_closed: u64,
    /// Currently open connections.
    pub connections_current: u64,
    /// Inbound events processed.
    pub events_received: u64,
    /// Outbound events delivered to connection buffers.
    pub events_sent: u64,
}

impl RealtimeMetrics {
    /// Creates zeroed metrics.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an opened connection.
    pub fn connection_opened(&self) {
        self.connections_opened.fetch_add(1, Ordering::Relaxed);
    }

    /// Records a closed connection.
    pub fn connection_closed(&self) {
        self.connections_closed.fetch_add(1, Ordering::Relaxed);
    }

    /// Records an inbound event.
    pub fn event_received(&self) {
        self.events_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Records `count` outbound deliveries.
    pub fn events_sent(&self, count: u64) {
        self.events_sent.fetch_add(count, Ordering::Relaxed);
    }

    /// Takes a snapshot of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        let opened = self.connections_opened.load(Ordering::Relaxed);
        let closed = self.connections_closed.load(Ordering::Relaxed);
        MetricsSnapshot {
            connections_opened: opened,
            connections_closed: closed,
            connections_current: opened.saturating_sub(closed),
            events_received: self.events_received.load(Ordering::Relaxed),
            events_sent: self.events_sent.load(Ordering::Relaxed),
        }
    }
}
