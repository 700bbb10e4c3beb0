//! Message delivery status state machine.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Delivery lifecycle of a message.
///
/// Status is monotonic: `sent → delivered → read`, never backward, and only
/// the receiving side advances it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "message_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    /// Persisted; the recipient has not received it yet.
    Sent,
    /// Reached at least one live connection of the recipient.
    Delivered,
    /// Acknowledged as viewed by the recipient. Terminal.
    Read,
}

impl MessageStatus {
    /// Whether a transition to `next` is a legal forward step.
    pub fn can_advance_to(&self, next: MessageStatus) -> bool {
        *self < next
    }

    /// Whether this status is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Read)
    }

    /// Return the status as a lowercase string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sent => "sent",
            Self::Delivered => "delivered",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for MessageStatus {
    type Err = chatline_core::AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "sent" => Ok(Self::Sent),
            "delivered" => Ok(Self::Delivered),
            "read" => Ok(Self::Read),
            _ => Err(chatline_core::AppError::validation(format!(
                "Invalid message status: '{s}'. Expected one of: sent, delivered, read"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_only_advances_forward() {
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Delivered));
        assert!(MessageStatus::Sent.can_advance_to(MessageStatus::Read));
        assert!(MessageStatus::Delivered.can_advance_to(MessageStatus::Read));

        assert!(!MessageStatus::Delivered.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Delivered));
        assert!(!MessageStatus::Read.can_advance_to(MessageStatus::Sent));
        assert!(!MessageStatus::Sent.can_advance_to(MessageStatus::Sent));
    }

    #[test]
    fn read_is_terminal() {
        assert!(MessageStatus::Read.is_terminal());
        assert!(!MessageStatus::Delivered.is_terminal());
    }

    #[test]
    fn serde_uses_lowercase() {
        assert_eq!(
            serde_json::to_string(&MessageStatus::Delivered).unwrap(),
            "\"delivered\""
        );
    }
}
