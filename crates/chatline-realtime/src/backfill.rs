//! Delivery backfill — reconnect catch-up.
//!
//! Runs once per successful registration, after the identity is known but
//! asynchronously relative to the handshake, promoting messages that were
//! sent while the identity was offline and notifying each original sender
//! exactly once.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use chatline_service::MessageService;

use crate::connection::manager::ConnectionManager;
use crate::event::ServerEvent;

/// Promotes `sent` messages to `delivered` when their recipient reconnects.
pub struct DeliveryBackfill {
    service: Arc<MessageService>,
    connections: Arc<ConnectionManager>,
}

impl std::fmt::Debug for DeliveryBackfill {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeliveryBackfill").finish()
    }
}

impl DeliveryBackfill {
    /// Creates a new backfill service.
    pub fn new(service: Arc<MessageService>, connections: Arc<ConnectionManager>) -> Self {
        Self {
            service,
            connections,
        }
    }

    /// Runs the catch-up pass for a freshly-registered identity.
    ///
    /// Zero pending messages is a no-op. Already-delivered messages are
    /// never re-processed. Failures are logged and swallowed; a missed
    /// backfill resolves itself on the next reconnect.
    pub async fn run(&self, recipient_id: Uuid) {
        match self.service.backfill_pending(recipient_id).await {
            Ok(senders) => {
                if senders.is_empty() {
                    return;
                }
                // One notification per distinct sender, not one per message.
                for sender_id in &senders {
                    self.connections
                        .send_to_user(*sender_id, &ServerEvent::MessageDelivered { recipient_id });
                }
                info!(
                    recipient_id = %recipient_id,
                    senders = senders.len(),
                    "Backfilled pending deliveries"
                );
            }
            Err(e) => {
                warn!(
                    recipient_id = %recipient_id,
                    error = %e,
                    "Delivery backfill failed"
                );
            }
        }
    }

    /// Spawns the catch-up pass so connection acceptance is not delayed.
    pub fn spawn(self: &Arc<Self>, recipient_id: Uuid) {
        let backfill = Arc::clone(self);
        tokio::spawn(async move {
            backfill.run(recipient_id).await;
        });
    }
}
