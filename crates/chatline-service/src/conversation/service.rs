//! Conversation find-or-create and sidebar listing.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use chatline_core::error::AppError;
use chatline_core::result::AppResult;
use chatline_database::store::{ConversationStore, MessageStore, UserStore};
use chatline_entity::conversation::{Conversation, ParticipantPair};
use chatline_entity::message::Message;
use chatline_entity::user::UserProfile;

/// A conversation as listed in the sidebar: the row, the other
/// participant's display fields, the last message, and the unread count.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    /// The conversation row.
    pub conversation: Conversation,
    /// The participant other than the requesting user.
    pub other: UserProfile,
    /// The most recent message, if any.
    pub last_message: Option<Message>,
    /// Messages from the other participant not yet read.
    pub unread_count: i64,
}

/// Manages conversation rows.
#[derive(Clone)]
pub struct ConversationService {
    conversations: Arc<dyn ConversationStore>,
    messages: Arc<dyn MessageStore>,
    users: Arc<dyn UserStore>,
}

impl std::fmt::Debug for ConversationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConversationService").finish()
    }
}

impl ConversationService {
    /// Creates a new conversation service.
    pub fn new(
        conversations: Arc<dyn ConversationStore>,
        messages: Arc<dyn MessageStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        Self {
            conversations,
            messages,
            users,
        }
    }

    /// Finds or creates the conversation between `user_id` and
    /// `other_user_id`. Idempotent for the unordered pair; rejects
    /// self-conversations and unknown counterparts.
    pub async fn open_conversation(
        &self,
        user_id: Uuid,
        other_user_id: Uuid,
    ) -> AppResult<Conversation> {
        let pair = ParticipantPair::new(user_id, other_user_id)?;

        if self.users.find_user(other_user_id).await?.is_none() {
            return Err(AppError::not_found("User not found"));
        }

        let conversation = self.conversations.find_or_create(pair).await?;
        info!(
            conversation_id = %conversation.id,
            user_id = %user_id,
            other_user_id = %other_user_id,
            "Conversation opened"
        );
        Ok(conversation)
    }

    /// Loads a conversation and verifies the caller participates in it.
    pub async fn load_for_participant(
        &self,
        conversation_id: Uuid,
        user_id: Uuid,
    ) -> AppResult<Conversation> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;

        if !conversation.is_participant(user_id) {
            return Err(AppError::forbidden(
                "Not a participant of this conversation",
            ));
        }
        Ok(conversation)
    }

    /// Lists the user's conversations, most recently active first, with the
    /// other participant resolved and per-conversation unread counts.
    pub async fn list_conversations(&self, user_id: Uuid) -> AppResult<Vec<ConversationSummary>> {
        let conversations = self.conversations.conversations_for(user_id).await?;

        let other_ids: Vec<Uuid> = conversations
            .iter()
            .filter_map(|c| c.other_participant(user_id))
            .collect();
        let others = self.users.find_users(&other_ids).await?;

        let mut summaries = Vec::with_capacity(conversations.len());
        for conversation in conversations {
            let Some(other_id) = conversation.other_participant(user_id) else {
                continue;
            };
            let Some(other) = others.iter().find(|u| u.id == other_id) else {
                continue;
            };

            let last_message = match conversation.last_message_id {
                Some(id) => self.messages.find_message(id).await?,
                None => None,
            };
            let unread_count = self
                .messages
                .count_unread(conversation.id, other_id)
                .await?;

            summaries.push(ConversationSummary {
                conversation,
                other: other.profile(),
                last_message,
                unread_count,
            });
        }
        Ok(summaries)
    }
}
