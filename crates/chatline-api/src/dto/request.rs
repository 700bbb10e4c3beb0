//! Request DTOs with validation.

use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use chatline_entity::message::MessageKind;

/// Open-or-create conversation request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenConversationRequest {
    /// The other participant.
    pub participant_id: Uuid,
}

/// Send message request body (HTTP path).
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SendMessageRequest {
    /// Content kind; defaults to text.
    #[serde(default = "default_kind")]
    pub kind: MessageKind,
    /// Textual content.
    #[validate(length(max = 5000, message = "Content exceeds 5000 characters"))]
    pub content: Option<String>,
    /// Media reference for image/video kinds.
    pub media_url: Option<String>,
    /// Client correlation id; generated server-side when absent.
    pub correlation_id: Option<Uuid>,
}

fn default_kind() -> MessageKind {
    MessageKind::Text
}
