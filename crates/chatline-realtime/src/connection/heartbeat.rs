//! Ping/pong heartbeat for connection keepalive.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio::time;
use tracing::{debug, warn};

use crate::event::ServerEvent;

use super::handle::ConnectionHandle;

/// Heartbeat configuration.
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings.
    pub ping_interval: Duration,
    /// Timeout before considering the connection dead.
    pub ping_timeout: Duration,
}

/// Run the heartbeat loop for a connection.
///
/// Sends periodic pings and checks for pong responses. Marks the connection
/// as dead when no pong arrives within the timeout after an interval.
pub async fn run_heartbeat(handle: Arc<ConnectionHandle>, config: HeartbeatConfig) {
    let mut interval = time::interval(config.ping_interval);
    // The first tick fires immediately; skip it so the deadline starts
    // counting from the first real ping.
    interval.tick().await;

    loop {
        interval.tick().await;

        if !handle.is_alive() {
            break;
        }

        let last_pong = *handle.last_pong.read().await;
        let elapsed = Utc::now() - last_pong;
        if let Ok(elapsed_std) = elapsed.to_std() {
            if elapsed_std > config.ping_interval + config.ping_timeout {
                warn!(
                    conn_id = %handle.id,
                    elapsed = ?elapsed_std,
                    "Heartbeat timeout, marking connection dead"
                );
                handle.mark_dead();
                break;
            }
        }

        let ping = ServerEvent::Ping {
            timestamp: Utc::now().timestamp(),
        };
        if !handle.send(ping) {
            debug!(conn_id = %handle.id, "Ping send failed, marking connection dead");
            handle.mark_dead();
            break;
        }
    }

    debug!(conn_id = %handle.id, "Heartbeat loop ended");
}
