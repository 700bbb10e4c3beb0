//! Message view with resolved sender display fields.

use serde::{Deserialize, Serialize};

use crate::user::UserProfile;

use super::model::Message;
use super::status::MessageStatus;

/// A fully-populated message as broadcast to clients and returned from the
/// HTTP send path: the row plus the sender's display fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageView {
    /// The message row.
    #[serde(flatten)]
    pub message: Message,
    /// Resolved sender profile.
    pub sender: UserProfile,
}

impl MessageView {
    /// Builds a view from a message and its resolved sender.
    pub fn new(message: Message, sender: UserProfile) -> Self {
        Self { message, sender }
    }

    /// Returns a copy with the status advanced, if the transition is legal.
    pub fn with_status(mut self, status: MessageStatus) -> Self {
        if self.message.status.can_advance_to(status) {
            self.message.status = status;
        }
        self
    }
}
