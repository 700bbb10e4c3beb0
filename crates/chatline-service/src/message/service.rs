//! The durable write path of the message lifecycle.
//!
//! Persists messages with status `sent`, maintains the conversation's
//! last-message pointer, performs bulk read-marking and the reconnect
//! backfill query. Presence-dependent decisions (the immediate `delivered`
//! promotion) and fan-out belong to the realtime engine.

use std::sync::Arc;

use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use chatline_core::error::AppError;
use chatline_core::result::AppResult;
use chatline_core::types::pagination::PageRequest;
use chatline_database::store::{ConversationStore, MessageStore, UserStore};
use chatline_entity::conversation::Conversation;
use chatline_entity::message::{MessageKind, MessageView, NewMessage};
use chatline_entity::user::UserProfile;

use crate::validate::validate_content;

/// Durable message operations.
#[derive(Clone)]
pub struct MessageService {
    messages: Arc<dyn MessageStore>,
    conversations: Arc<dyn ConversationStore>,
    users: Arc<dyn UserStore>,
    text_max_chars: usize,
}

impl std::fmt::Debug for MessageService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageService").finish()
    }
}

impl MessageService {
    /// Creates a new message service.
    pub fn new(
        messages: Arc<dyn MessageStore>,
        conversations: Arc<dyn ConversationStore>,
        users: Arc<dyn UserStore>,
        text_max_chars: usize,
    ) -> Self {
        Self {
            messages,
            conversations,
            users,
            text_max_chars,
        }
    }

    /// Creates a message in the conversation.
    ///
    /// Validates that the sender participates and that the content fits the
    /// kind, persists with status `sent`, updates the conversation's
    /// last-message pointer, and returns the fully-populated view. A store
    /// failure anywhere here aborts the operation.
    pub async fn create_message(
        &self,
        conversation_id: Uuid,
        sender_id: Uuid,
        kind: MessageKind,
        content: Option<&str>,
        media_url: Option<&str>,
    ) -> AppResult<(Conversation, MessageView)> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;

        if !conversation.is_participant(sender_id) {
            return Err(AppError::forbidden(
                "Not a participant of this conversation",
            ));
        }

        let valid = validate_content(kind, content, media_url, self.text_max_chars)?;

        let message = self
            .messages
            .insert(&NewMessage {
                conversation_id,
                sender_id,
                kind,
                content: valid.content,
                media_url: valid.media_url,
            })
            .await?;

        self.conversations
            .touch(conversation_id, message.id, message.created_at)
            .await?;

        let sender = self.sender_profile(sender_id).await?;

        debug!(
            message_id = %message.id,
            conversation_id = %conversation_id,
            sender_id = %sender_id,
            "Message persisted"
        );

        Ok((conversation, MessageView::new(message, sender)))
    }

    /// Advances a single message `sent → delivered`. Returns whether the
    /// status actually changed.
    pub async fn mark_delivered(&self, message_id: Uuid) -> AppResult<bool> {
        self.messages.mark_delivered(message_id).await
    }

    /// Transitions every non-read message authored by `other_party_id` in
    /// the conversation to `read`, recording receipts for `reader_id`.
    /// Idempotent: returns the number of messages that changed; zero means
    /// callers must not emit any broadcast.
    pub async fn mark_read(
        &self,
        conversation_id: Uuid,
        reader_id: Uuid,
        other_party_id: Uuid,
    ) -> AppResult<u64> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;

        if !conversation.is_participant(reader_id) {
            return Err(AppError::forbidden(
                "Not a participant of this conversation",
            ));
        }

        self.messages
            .mark_read(conversation_id, other_party_id, reader_id, Utc::now())
            .await
    }

    /// Promotes every `sent` message addressed to the reconnected user to
    /// `delivered`, returning the distinct original senders.
    pub async fn backfill_pending(&self, recipient_id: Uuid) -> AppResult<Vec<Uuid>> {
        self.messages.promote_pending(recipient_id).await
    }

    /// A page of conversation history with resolved sender profiles,
    /// ascending by creation time.
    pub async fn list_messages(
        &self,
        conversation_id: Uuid,
        requester_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<Vec<MessageView>> {
        let conversation = self
            .conversations
            .find_conversation(conversation_id)
            .await?
            .ok_or_else(|| AppError::not_found("Conversation not found"))?;

        if !conversation.is_participant(requester_id) {
            return Err(AppError::forbidden(
                "Not a participant of this conversation",
            ));
        }

        let messages = self
            .messages
            .page_for_conversation(conversation_id, page)
            .await?;

        let mut sender_ids: Vec<Uuid> = messages.iter().map(|m| m.sender_id).collect();
        sender_ids.sort_unstable();
        sender_ids.dedup();
        let senders = self.users.find_users(&sender_ids).await?;

        Ok(messages
            .into_iter()
            .map(|message| {
                let sender = senders
                    .iter()
                    .find(|u| u.id == message.sender_id)
                    .map(|u| u.profile())
                    .unwrap_or_else(|| UserProfile {
                        id: message.sender_id,
                        username: String::new(),
                        display_name: None,
                        avatar_url: None,
                    });
                MessageView::new(message, sender)
            })
            .collect())
    }

    async fn sender_profile(&self, sender_id: Uuid) -> AppResult<UserProfile> {
        Ok(self
            .users
            .find_user(sender_id)
            .await?
            .ok_or_else(|| AppError::internal("Sender row missing"))?
            .profile())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_core::error::ErrorKind;
    use chatline_database::memory::MemoryStore;
    use chatline_database::store::ConversationStore;
    use chatline_entity::conversation::ParticipantPair;
    use chatline_entity::message::MessageStatus;

    async fn setup() -> (Arc<MemoryStore>, MessageService, Uuid, Uuid, Uuid) {
        let store = Arc::new(MemoryStore::new());
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        let convo = store
            .find_or_create(ParticipantPair::new(alice.id, bob.id).unwrap())
            .await
            .unwrap();
        let svc = MessageService::new(store.clone(), store.clone(), store.clone(), 5000);
        (store, svc, convo.id, alice.id, bob.id)
    }

    #[tokio::test]
    async fn create_persists_sent_and_touches_conversation() {
        let (store, svc, convo_id, alice, _bob) = setup().await;

        let (_, view) = svc
            .create_message(convo_id, alice, MessageKind::Text, Some("hello"), None)
            .await
            .unwrap();

        assert_eq!(view.message.status, MessageStatus::Sent);
        assert_eq!(view.sender.username, "alice");

        let convo = store.find_conversation(convo_id).await.unwrap().unwrap();
        assert_eq!(convo.last_message_id, Some(view.message.id));
        assert_eq!(convo.last_activity_at, view.message.created_at);
    }

    #[tokio::test]
    async fn non_participants_are_rejected_before_persistence() {
        let (store, svc, convo_id, _alice, _bob) = setup().await;
        let mallory = store.add_user("mallory").await;

        let err = svc
            .create_message(convo_id, mallory.id, MessageKind::Text, Some("hi"), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authorization);

        let page = store
            .page_for_conversation(convo_id, &PageRequest::default())
            .await
            .unwrap();
        assert!(page.is_empty());
    }

    #[tokio::test]
    async fn invalid_content_is_rejected() {
        let (_store, svc, convo_id, alice, _bob) = setup().await;

        let err = svc
            .create_message(convo_id, alice, MessageKind::Text, Some("   "), None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);

        let err = svc
            .create_message(convo_id, alice, MessageKind::Image, None, None)
            .await
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Validation);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent() {
        let (_store, svc, convo_id, alice, bob) = setup().await;

        svc.create_message(convo_id, alice, MessageKind::Text, Some("one"), None)
            .await
            .unwrap();
        svc.create_message(convo_id, alice, MessageKind::Text, Some("two"), None)
            .await
            .unwrap();

        let first = svc.mark_read(convo_id, bob, alice).await.unwrap();
        assert_eq!(first, 2);
        let second = svc.mark_read(convo_id, bob, alice).await.unwrap();
        assert_eq!(second, 0);
    }

    #[tokio::test]
    async fn history_resolves_sender_profiles() {
        let (_store, svc, convo_id, alice, bob) = setup().await;

        svc.create_message(convo_id, alice, MessageKind::Text, Some("from alice"), None)
            .await
            .unwrap();
        svc.create_message(convo_id, bob, MessageKind::Text, Some("from bob"), None)
            .await
            .unwrap();

        let views = svc
            .list_messages(convo_id, alice, &PageRequest::default())
            .await
            .unwrap();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].sender.username, "alice");
        assert_eq!(views[1].sender.username, "bob");
    }
}
