//! Message entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use super::kind::MessageKind;
use super::status::MessageStatus;

/// A persisted message belonging to exactly one conversation.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// The conversation this message belongs to.
    pub conversation_id: Uuid,
    /// The authoring user.
    pub sender_id: Uuid,
    /// Content kind.
    pub kind: MessageKind,
    /// Textual content (required for text, optional otherwise).
    pub content: Option<String>,
    /// Media reference (required for image/video).
    pub media_url: Option<String>,
    /// Delivery status.
    pub status: MessageStatus,
    /// When the message was created.
    pub created_at: DateTime<Utc>,
    /// When the message was last updated.
    pub updated_at: DateTime<Utc>,
}

impl Message {
    /// Whether the given user authored this message.
    pub fn is_from(&self, user_id: Uuid) -> bool {
        self.sender_id == user_id
    }
}

/// Data required to persist a new message. Status always starts at `sent`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// The target conversation.
    pub conversation_id: Uuid,
    /// The authoring user.
    pub sender_id: Uuid,
    /// Content kind.
    pub kind: MessageKind,
    /// Validated textual content.
    pub content: Option<String>,
    /// Validated media reference.
    pub media_url: Option<String>,
}

/// A read receipt: who read a message, and when.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct MessageReceipt {
    /// The message that was read.
    pub message_id: Uuid,
    /// The reader.
    pub reader_id: Uuid,
    /// When it was read.
    pub read_at: DateTime<Utc>,
}
