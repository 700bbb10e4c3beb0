//! Top-level real-time engine that ties together all subsystems.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc};
use tracing::{error, info, warn};
use uuid::Uuid;

use chatline_core::config::realtime::RealtimeConfig;
use chatline_core::error::{AppError, ErrorKind};
use chatline_database::store::UserStore;
use chatline_service::{ConversationService, MessageService};

use crate::backfill::DeliveryBackfill;
use crate::connection::handle::{ConnectionHandle, ConnectionId};
use crate::connection::heartbeat::{HeartbeatConfig, run_heartbeat};
use crate::connection::manager::ConnectionManager;
use crate::connection::pool::ConnectionPool;
use crate::event::{ClientEvent, ServerEvent};
use crate::lifecycle::manager::{MessageLifecycle, SendMessageInput};
use crate::metrics::RealtimeMetrics;
use crate::presence::registry::PresenceRegistry;
use crate::room::router::RoomRouter;
use crate::typing::TypingBroadcaster;

/// Central real-time engine coordinating all subsystems.
///
/// Each inbound event type maps to exactly one handler; errors from a
/// handler become a single `error` event to the originating connection.
#[derive(Clone)]
pub struct RealtimeEngine {
    /// Connection manager.
    pub connections: Arc<ConnectionManager>,
    /// Room membership tables.
    pub rooms: Arc<RoomRouter>,
    /// Presence registry.
    pub presence: Arc<PresenceRegistry>,
    /// Message lifecycle manager.
    pub lifecycle: Arc<MessageLifecycle>,
    /// Delivery backfill service.
    pub backfill: Arc<DeliveryBackfill>,
    /// Typing relay.
    pub typing: Arc<TypingBroadcaster>,
    /// Metrics collector.
    pub metrics: Arc<RealtimeMetrics>,
    /// Conversation service, for join authorization.
    conversations: Arc<ConversationService>,
    /// Configuration.
    config: RealtimeConfig,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for RealtimeEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RealtimeEngine").finish()
    }
}

impl RealtimeEngine {
    /// Creates a new real-time engine with all subsystems.
    pub fn new(
        config: RealtimeConfig,
        users: Arc<dyn UserStore>,
        messages: Arc<MessageService>,
        conversations: Arc<ConversationService>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(RealtimeMetrics::new());
        let pool = Arc::new(ConnectionPool::new());
        let rooms = Arc::new(RoomRouter::new());
        let presence = Arc::new(PresenceRegistry::new());
        let connections = Arc::new(ConnectionManager::new(
            config.clone(),
            pool,
            rooms.clone(),
            presence.clone(),
            users,
            metrics.clone(),
        ));
        let lifecycle = Arc::new(MessageLifecycle::new(
            messages.clone(),
            presence.clone(),
            connections.clone(),
        ));
        let backfill = Arc::new(DeliveryBackfill::new(messages, connections.clone()));
        let typing = Arc::new(TypingBroadcaster::new(connections.clone()));

        info!("Real-time engine initialized");

        Self {
            connections,
            rooms,
            presence,
            lifecycle,
            backfill,
            typing,
            metrics,
            conversations,
            config,
            shutdown_tx,
        }
    }

    /// Registers an authenticated connection and starts its background
    /// tasks: the heartbeat loop and the delivery backfill pass. The
    /// backfill runs detached so the handshake response is never delayed.
    pub async fn connect(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        username: String,
    ) -> (Arc<ConnectionHandle>, mpsc::Receiver<ServerEvent>) {
        let (handle, rx) = self
            .connections
            .register(user_id, session_id, username)
            .await;

        self.backfill.spawn(user_id);

        let heartbeat = HeartbeatConfig {
            ping_interval: Duration::from_secs(self.config.ping_interval_seconds),
            ping_timeout: Duration::from_secs(self.config.ping_timeout_seconds),
        };
        tokio::spawn(run_heartbeat(handle.clone(), heartbeat));

        (handle, rx)
    }

    /// Tears down a connection. The only cancellation signal in the engine;
    /// rooms and presence are cleaned up before this returns.
    pub async fn disconnect(&self, conn_id: &ConnectionId) {
        self.connections.unregister(conn_id).await;
    }

    /// Processes one raw inbound frame from a connection.
    pub async fn handle_event(&self, conn_id: ConnectionId, raw: &str) {
        let Some(handle) = self.connections.get(&conn_id) else {
            warn!(conn_id = %conn_id, "Event from unknown connection");
            return;
        };
        self.metrics.event_received();

        let event: ClientEvent = match serde_json::from_str(raw) {
            Ok(event) => event,
            Err(e) => {
                handle.send(ServerEvent::from_error(&AppError::new(
                    ErrorKind::Validation,
                    format!("Failed to parse event: {e}"),
                )));
                return;
            }
        };

        let result = self.dispatch(&handle, event).await;

        if let Err(e) = result {
            if e.kind == ErrorKind::Database {
                error!(conn_id = %conn_id, error = %e, "Store failure while handling event");
            }
            // Rejections and store failures surface to the originating
            // connection only; nothing reaches the broadcast path.
            handle.send(ServerEvent::from_error(&e));
        }
    }

    /// Routes a typed event to its handler.
    async fn dispatch(
        &self,
        handle: &Arc<ConnectionHandle>,
        event: ClientEvent,
    ) -> Result<(), AppError> {
        match event {
            ClientEvent::JoinConversation { conversation_id } => {
                self.conversations
                    .load_for_participant(conversation_id, handle.user_id)
                    .await?;
                self.rooms.join_conversation(handle.id, conversation_id);
                Ok(())
            }
            ClientEvent::LeaveConversation { conversation_id } => {
                self.rooms.leave_conversation(handle.id, conversation_id);
                Ok(())
            }
            ClientEvent::SendMessage {
                conversation_id,
                kind,
                content,
                media_url,
                recipient_id: _,
                correlation_id,
            } => {
                self.lifecycle
                    .send_message(
                        handle.user_id,
                        SendMessageInput {
                            conversation_id,
                            kind,
                            content,
                            media_url,
                            correlation_id,
                        },
                    )
                    .await?;
                Ok(())
            }
            ClientEvent::TypingStart {
                conversation_id, ..
            } => {
                self.typing
                    .relay_start(handle.id, handle.user_id, conversation_id);
                Ok(())
            }
            ClientEvent::TypingStop {
                conversation_id, ..
            } => {
                self.typing
                    .relay_stop(handle.id, handle.user_id, conversation_id);
                Ok(())
            }
            ClientEvent::MarkRead {
                conversation_id,
                other_party_id,
            } => {
                self.lifecycle
                    .mark_read(handle.id, handle.user_id, conversation_id, other_party_id)
                    .await
            }
            ClientEvent::Pong { .. } => {
                handle.record_pong().await;
                Ok(())
            }
        }
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Initiates a graceful shutdown of the real-time engine.
    pub async fn shutdown(&self) {
        info!("Shutting down real-time engine");
        let _ = self.shutdown_tx.send(());
        self.connections.close_all().await;
        info!("Real-time engine shut down");
    }
}
