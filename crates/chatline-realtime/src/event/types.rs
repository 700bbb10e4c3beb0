//! Inbound and outbound realtime event type definitions.
//!
//! Event names on the wire are the kebab-case `type` tags; each inbound
//! variant maps to exactly one handler in the engine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatline_core::error::AppError;
use chatline_entity::message::{MessageKind, MessageView};

/// Events sent by the client to the server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Enter a conversation room (implicitly leaves any prior one).
    JoinConversation {
        /// Conversation to view.
        conversation_id: Uuid,
    },
    /// Leave the current conversation room.
    LeaveConversation {
        /// Conversation to stop viewing.
        conversation_id: Uuid,
    },
    /// Create and broadcast a message.
    SendMessage {
        /// Target conversation.
        conversation_id: Uuid,
        /// Content kind.
        #[serde(default = "default_kind")]
        kind: MessageKind,
        /// Textual content.
        content: Option<String>,
        /// Media reference for image/video kinds.
        media_url: Option<String>,
        /// The other participant, as the client sees it. The server derives
        /// the recipient from the conversation row; this field is advisory.
        recipient_id: Uuid,
        /// Client-generated token unifying the optimistic placeholder with
        /// the confirmed message.
        correlation_id: Uuid,
    },
    /// Ephemeral typing signal.
    TypingStart {
        /// Conversation being typed in.
        conversation_id: Uuid,
        /// The other participant (advisory).
        recipient_id: Uuid,
    },
    /// Ephemeral typing-stopped signal.
    TypingStop {
        /// Conversation being typed in.
        conversation_id: Uuid,
        /// The other participant (advisory).
        recipient_id: Uuid,
    },
    /// Bulk read receipt for the other party's messages.
    MarkRead {
        /// Conversation being read.
        conversation_id: Uuid,
        /// Author whose messages are being acknowledged.
        other_party_id: Uuid,
    },
    /// Pong response to a server ping.
    Pong {
        /// Echoed timestamp.
        timestamp: i64,
    },
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}

/// Events sent by the server to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// Full set of currently-online identities, sent once on connect.
    PresenceSnapshot {
        /// Online user IDs, including the receiver.
        user_ids: Vec<Uuid>,
    },
    /// An identity came online. Broadcast to all connections.
    PresenceOnline {
        /// The identity.
        user_id: Uuid,
    },
    /// An identity went offline. Broadcast to all connections.
    PresenceOffline {
        /// The identity.
        user_id: Uuid,
        /// When the last connection dropped.
        last_seen_at: DateTime<Utc>,
    },
    /// A message was created (confirmation and notification in one).
    MessageCreated {
        /// The fully-populated message.
        message: MessageView,
        /// Echo of the client's correlation id.
        correlation_id: Uuid,
    },
    /// Pending messages to `recipient_id` were delivered. Sent to the
    /// original sender's personal channel.
    MessageDelivered {
        /// The recipient that came online or received the message.
        recipient_id: Uuid,
    },
    /// Messages in a conversation were read.
    MessageRead {
        /// The conversation.
        conversation_id: Uuid,
        /// Who read them.
        reader_id: Uuid,
    },
    /// A participant started typing.
    TypingStart {
        /// The conversation.
        conversation_id: Uuid,
        /// Who is typing.
        sender_id: Uuid,
    },
    /// A participant stopped typing.
    TypingStop {
        /// The conversation.
        conversation_id: Uuid,
        /// Who stopped.
        sender_id: Uuid,
    },
    /// Server keepalive.
    Ping {
        /// Server timestamp (seconds since epoch).
        timestamp: i64,
    },
    /// A malformed or rejected intent.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Human-readable message.
        message: String,
    },
}

impl ServerEvent {
    /// Builds an error event from an application error.
    pub fn from_error(err: &AppError) -> Self {
        Self::Error {
            code: err.kind.to_string(),
            message: err.message.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_kebab_case_tags() {
        let raw = r#"{"type":"join-conversation","conversation_id":"4b4002f1-7ef1-4798-93b2-2513e7a1e4d8"}"#;
        let event: ClientEvent = serde_json::from_str(raw).unwrap();
        assert!(matches!(event, ClientEvent::JoinConversation { .. }));
    }

    #[test]
    fn send_message_defaults_to_text_kind() {
        let raw = format!(
            r#"{{"type":"send-message","conversation_id":"{}","content":"hi","recipient_id":"{}","correlation_id":"{}"}}"#,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4()
        );
        let event: ClientEvent = serde_json::from_str(&raw).unwrap();
        match event {
            ClientEvent::SendMessage { kind, .. } => assert_eq!(kind, MessageKind::Text),
            other => panic!("unexpected event: {other:?}"),
        }
    }

    #[test]
    fn server_events_serialize_with_wire_names() {
        let ev = ServerEvent::PresenceOnline {
            user_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains(r#""type":"presence-online""#));

        let ev = ServerEvent::MessageDelivered {
            recipient_id: Uuid::new_v4(),
        };
        let json = serde_json::to_string(&ev).unwrap();
        assert!(json.contains(r#""type":"message-delivered""#));
    }

    #[test]
    fn error_event_carries_kind_code() {
        let err = AppError::forbidden("Not a participant of this conversation");
        match ServerEvent::from_error(&err) {
            ServerEvent::Error { code, message } => {
                assert_eq!(code, "AUTHORIZATION");
                assert!(message.contains("participant"));
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }
}
