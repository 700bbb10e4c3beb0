//! Conversation entity model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use chatline_core::AppError;

/// A two-party message thread.
///
/// Participants are stored in normalized order (`participant_a <
/// participant_b`) so the unordered pair is unique at the schema level and
/// find-or-create stays idempotent.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: Uuid,
    /// First participant (lower UUID).
    pub participant_a: Uuid,
    /// Second participant (higher UUID).
    pub participant_b: Uuid,
    /// Pointer to the most recent message.
    pub last_message_id: Option<Uuid>,
    /// Timestamp used for sidebar ordering.
    pub last_activity_at: DateTime<Utc>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Both participant IDs.
    pub fn participants(&self) -> [Uuid; 2] {
        [self.participant_a, self.participant_b]
    }

    /// Whether the given user belongs to this conversation.
    pub fn is_participant(&self, user_id: Uuid) -> bool {
        self.participant_a == user_id || self.participant_b == user_id
    }

    /// The participant other than `user_id`, if `user_id` belongs here.
    pub fn other_participant(&self, user_id: Uuid) -> Option<Uuid> {
        if self.participant_a == user_id {
            Some(self.participant_b)
        } else if self.participant_b == user_id {
            Some(self.participant_a)
        } else {
            None
        }
    }
}

/// An unordered pair of participant identities, stored normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ParticipantPair {
    /// Lower UUID of the pair.
    pub a: Uuid,
    /// Higher UUID of the pair.
    pub b: Uuid,
}

impl ParticipantPair {
    /// Normalizes two identities into a pair, rejecting self-conversations.
    pub fn new(first: Uuid, second: Uuid) -> Result<Self, AppError> {
        if first == second {
            return Err(AppError::validation(
                "Cannot create a conversation with yourself",
            ));
        }
        if first < second {
            Ok(Self { a: first, b: second })
        } else {
            Ok(Self { a: second, b: first })
        }
    }

    /// Whether the given user is one of the pair.
    pub fn contains(&self, user_id: Uuid) -> bool {
        self.a == user_id || self.b == user_id
    }
}
