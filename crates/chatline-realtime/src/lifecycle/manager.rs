//! Message lifecycle manager.
//!
//! Owns the `sent → delivered → read` state machine over the durable
//! service: creates messages, promotes them to `delivered` before the first
//! broadcast when the recipient is online, and performs idempotent bulk
//! read-marking. All operations on one conversation are serialized through
//! [`super::locks::ConversationLocks`].

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use chatline_core::error::AppError;
use chatline_core::result::AppResult;
use chatline_entity::message::{MessageKind, MessageStatus, MessageView};
use chatline_service::MessageService;

use crate::connection::handle::ConnectionId;
use crate::connection::manager::ConnectionManager;
use crate::event::ServerEvent;
use crate::presence::registry::PresenceRegistry;
use crate::room::router::Room;

use super::locks::ConversationLocks;

/// Parameters of a send-message intent.
#[derive(Debug, Clone)]
pub struct SendMessageInput {
    /// Target conversation.
    pub conversation_id: Uuid,
    /// Content kind.
    pub kind: MessageKind,
    /// Textual content.
    pub content: Option<String>,
    /// Media reference.
    pub media_url: Option<String>,
    /// Client correlation id, echoed in the confirmation.
    pub correlation_id: Uuid,
}

/// Drives message state transitions and their fan-out.
pub struct MessageLifecycle {
    service: Arc<MessageService>,
    presence: Arc<PresenceRegistry>,
    connections: Arc<ConnectionManager>,
    locks: ConversationLocks,
}

impl std::fmt::Debug for MessageLifecycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageLifecycle").finish()
    }
}

impl MessageLifecycle {
    /// Creates a new lifecycle manager.
    pub fn new(
        service: Arc<MessageService>,
        presence: Arc<PresenceRegistry>,
        connections: Arc<ConnectionManager>,
    ) -> Self {
        Self {
            service,
            presence,
            connections,
            locks: ConversationLocks::new(),
        }
    }

    /// Creates a message and broadcasts it.
    ///
    /// When the recipient is online at send time the message is advanced to
    /// `delivered` before it leaves the server, so no client ever renders a
    /// sent-then-immediately-delivered flicker. The `message-created` event
    /// goes to the conversation room and both participants' personal
    /// channels, at most once per connection.
    pub async fn send_message(
        &self,
        sender_id: Uuid,
        input: SendMessageInput,
    ) -> AppResult<MessageView> {
        let lock = self.locks.for_conversation(input.conversation_id);
        let _guard = lock.lock().await;

        let (conversation, mut view) = self
            .service
            .create_message(
                input.conversation_id,
                sender_id,
                input.kind,
                input.content.as_deref(),
                input.media_url.as_deref(),
            )
            .await?;

        let recipient_id = conversation
            .other_participant(sender_id)
            .ok_or_else(|| AppError::internal("Sender passed participant check but has no peer"))?;

        if self.presence.is_online(recipient_id)
            && self.service.mark_delivered(view.message.id).await?
        {
            view.message.status = MessageStatus::Delivered;
        }

        let event = ServerEvent::MessageCreated {
            message: view.clone(),
            correlation_id: input.correlation_id,
        };
        self.connections.broadcast_rooms(
            &[
                Room::Conversation(input.conversation_id),
                Room::User(sender_id),
                Room::User(recipient_id),
            ],
            &event,
            None,
        );

        debug!(
            message_id = %view.message.id,
            conversation_id = %input.conversation_id,
            status = %view.message.status,
            "Message created and broadcast"
        );

        Ok(view)
    }

    /// Transitions the other party's unread messages to `read` and
    /// broadcasts a single `message-read` event.
    ///
    /// Idempotent: when nothing was pending, no event is emitted, so the
    /// client may safely invoke this on every inbound message while the
    /// conversation is focused.
    pub async fn mark_read(
        &self,
        origin: ConnectionId,
        reader_id: Uuid,
        conversation_id: Uuid,
        other_party_id: Uuid,
    ) -> AppResult<()> {
        let lock = self.locks.for_conversation(conversation_id);
        let _guard = lock.lock().await;

        let affected = self
            .service
            .mark_read(conversation_id, reader_id, other_party_id)
            .await?;

        if affected > 0 {
            let event = ServerEvent::MessageRead {
                conversation_id,
                reader_id,
            };
            self.connections.broadcast_rooms(
                &[
                    Room::Conversation(conversation_id),
                    Room::User(other_party_id),
                ],
                &event,
                Some(origin),
            );

            debug!(
                conversation_id = %conversation_id,
                reader_id = %reader_id,
                count = affected,
                "Messages marked read"
            );
        }

        Ok(())
    }
}
