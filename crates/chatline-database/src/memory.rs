//! In-memory store provider.
//!
//! Implements all store traits over process-local maps. Selected with
//! `database.provider = "memory"` for development without PostgreSQL, and
//! used as the store double in engine-level tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use chatline_core::error::AppError;
use chatline_core::result::AppResult;
use chatline_core::types::pagination::PageRequest;
use chatline_entity::conversation::{Conversation, ParticipantPair};
use chatline_entity::message::{Message, MessageReceipt, MessageStatus, NewMessage};
use chatline_entity::user::User;

use crate::store::{ConversationStore, MessageStore, UserStore};

#[derive(Debug, Default)]
struct Inner {
    users: HashMap<Uuid, User>,
    conversations: HashMap<Uuid, Conversation>,
    pair_index: HashMap<ParticipantPair, Uuid>,
    /// Messages in insertion order (single process, so also creation order).
    messages: Vec<Message>,
    receipts: Vec<MessageReceipt>,
}

/// Process-local implementation of all store traits.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a user row, returning it. Used by dev seeding and tests.
    pub async fn add_user(&self, username: &str) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            display_name: Some(username.to_string()),
            avatar_url: None,
            is_online: false,
            last_seen_at: None,
            created_at: now,
            updated_at: now,
        };
        self.inner
            .write()
            .await
            .users
            .insert(user.id, user.clone());
        user
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        Ok(self.inner.read().await.users.get(&id).cloned())
    }

    async fn find_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        let inner = self.inner.read().await;
        Ok(ids
            .iter()
            .filter_map(|id| inner.users.get(id).cloned())
            .collect())
    }

    async fn set_presence(
        &self,
        id: Uuid,
        online: bool,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let user = inner
            .users
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("User {id} not found")))?;
        user.is_online = online;
        if last_seen_at.is_some() {
            user.last_seen_at = last_seen_at;
        }
        user.updated_at = Utc::now();
        Ok(())
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn find_or_create(&self, pair: ParticipantPair) -> AppResult<Conversation> {
        let mut inner = self.inner.write().await;
        if let Some(id) = inner.pair_index.get(&pair) {
            return Ok(inner.conversations[id].clone());
        }
        let now = Utc::now();
        let conversation = Conversation {
            id: Uuid::new_v4(),
            participant_a: pair.a,
            participant_b: pair.b,
            last_message_id: None,
            last_activity_at: now,
            created_at: now,
        };
        inner.pair_index.insert(pair, conversation.id);
        inner
            .conversations
            .insert(conversation.id, conversation.clone());
        Ok(conversation)
    }

    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        Ok(self.inner.read().await.conversations.get(&id).cloned())
    }

    async fn conversations_for(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        let inner = self.inner.read().await;
        let mut conversations: Vec<Conversation> = inner
            .conversations
            .values()
            .filter(|c| c.is_participant(user_id))
            .cloned()
            .collect();
        conversations.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        Ok(conversations)
    }

    async fn touch(&self, id: Uuid, last_message_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        let conversation = inner
            .conversations
            .get_mut(&id)
            .ok_or_else(|| AppError::not_found(format!("Conversation {id} not found")))?;
        conversation.last_message_id = Some(last_message_id);
        conversation.last_activity_at = at;
        Ok(())
    }
}

#[async_trait]
impl MessageStore for MemoryStore {
    async fn insert(&self, new: &NewMessage) -> AppResult<Message> {
        let now = Utc::now();
        let message = Message {
            id: Uuid::new_v4(),
            conversation_id: new.conversation_id,
            sender_id: new.sender_id,
            kind: new.kind,
            content: new.content.clone(),
            media_url: new.media_url.clone(),
            status: MessageStatus::Sent,
            created_at: now,
            updated_at: now,
        };
        self.inner.write().await.messages.push(message.clone());
        Ok(message)
    }

    async fn find_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        Ok(self
            .inner
            .read()
            .await
            .messages
            .iter()
            .find(|m| m.id == id)
            .cloned())
    }

    async fn page_for_conversation(
        &self,
        conversation_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<Vec<Message>> {
        let inner = self.inner.read().await;
        let mut newest_first: Vec<Message> = inner
            .messages
            .iter()
            .filter(|m| m.conversation_id == conversation_id)
            .rev()
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .cloned()
            .collect();
        newest_first.reverse();
        Ok(newest_first)
    }

    async fn mark_delivered(&self, message_id: Uuid) -> AppResult<bool> {
        let mut inner = self.inner.write().await;
        if let Some(message) = inner.messages.iter_mut().find(|m| m.id == message_id) {
            if message.status == MessageStatus::Sent {
                message.status = MessageStatus::Delivered;
                message.updated_at = Utc::now();
                return Ok(true);
            }
        }
        Ok(false)
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        author_id: Uuid,
        reader_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        let mut inner = self.inner.write().await;
        let mut advanced = Vec::new();
        for message in inner.messages.iter_mut() {
            if message.conversation_id == conversation_id
                && message.sender_id == author_id
                && message.status != MessageStatus::Read
            {
                message.status = MessageStatus::Read;
                message.updated_at = at;
                advanced.push(message.id);
            }
        }
        for message_id in &advanced {
            let exists = inner
                .receipts
                .iter()
                .any(|r| r.message_id == *message_id && r.reader_id == reader_id);
            if !exists {
                inner.receipts.push(MessageReceipt {
                    message_id: *message_id,
                    reader_id,
                    read_at: at,
                });
            }
        }
        Ok(advanced.len() as u64)
    }

    async fn promote_pending(&self, recipient_id: Uuid) -> AppResult<Vec<Uuid>> {
        let mut inner = self.inner.write().await;
        let conversation_ids: Vec<Uuid> = inner
            .conversations
            .values()
            .filter(|c| c.is_participant(recipient_id))
            .map(|c| c.id)
            .collect();

        let mut senders = Vec::new();
        for message in inner.messages.iter_mut() {
            if conversation_ids.contains(&message.conversation_id)
                && message.sender_id != recipient_id
                && message.status == MessageStatus::Sent
            {
                message.status = MessageStatus::Delivered;
                message.updated_at = Utc::now();
                senders.push(message.sender_id);
            }
        }
        senders.sort_unstable();
        senders.dedup();
        Ok(senders)
    }

    async fn count_unread(&self, conversation_id: Uuid, author_id: Uuid) -> AppResult<i64> {
        let inner = self.inner.read().await;
        Ok(inner
            .messages
            .iter()
            .filter(|m| {
                m.conversation_id == conversation_id
                    && m.sender_id == author_id
                    && m.status != MessageStatus::Read
            })
            .count() as i64)
    }

    async fn receipts_for(&self, message_id: Uuid) -> AppResult<Vec<MessageReceipt>> {
        let inner = self.inner.read().await;
        Ok(inner
            .receipts
            .iter()
            .filter(|r| r.message_id == message_id)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_entity::message::MessageKind;

    async fn seeded() -> (MemoryStore, User, User) {
        let store = MemoryStore::new();
        let alice = store.add_user("alice").await;
        let bob = store.add_user("bob").await;
        (store, alice, bob)
    }

    fn text_message(conversation_id: Uuid, sender_id: Uuid, content: &str) -> NewMessage {
        NewMessage {
            conversation_id,
            sender_id,
            kind: MessageKind::Text,
            content: Some(content.to_string()),
            media_url: None,
        }
    }

    #[tokio::test]
    async fn find_or_create_is_idempotent_and_order_independent() {
        let (store, alice, bob) = seeded().await;
        let first = store
            .find_or_create(ParticipantPair::new(alice.id, bob.id).unwrap())
            .await
            .unwrap();
        let second = store
            .find_or_create(ParticipantPair::new(bob.id, alice.id).unwrap())
            .await
            .unwrap();
        assert_eq!(first.id, second.id);
    }

    #[tokio::test]
    async fn mark_read_is_idempotent_and_records_receipts() {
        let (store, alice, bob) = seeded().await;
        let convo = store
            .find_or_create(ParticipantPair::new(alice.id, bob.id).unwrap())
            .await
            .unwrap();
        let message = store
            .insert(&text_message(convo.id, alice.id, "hi"))
            .await
            .unwrap();

        let now = Utc::now();
        let first = store.mark_read(convo.id, alice.id, bob.id, now).await.unwrap();
        assert_eq!(first, 1);
        let second = store.mark_read(convo.id, alice.id, bob.id, now).await.unwrap();
        assert_eq!(second, 0);

        let stored = store.find_message(message.id).await.unwrap().unwrap();
        assert_eq!(stored.status, MessageStatus::Read);
        let receipts = store.receipts_for(message.id).await.unwrap();
        assert_eq!(receipts.len(), 1);
        assert_eq!(receipts[0].reader_id, bob.id);
    }

    #[tokio::test]
    async fn promote_pending_returns_distinct_senders_once() {
        let (store, alice, bob) = seeded().await;
        let carol = store.add_user("carol").await;
        let ab = store
            .find_or_create(ParticipantPair::new(alice.id, bob.id).unwrap())
            .await
            .unwrap();
        let cb = store
            .find_or_create(ParticipantPair::new(carol.id, bob.id).unwrap())
            .await
            .unwrap();

        store.insert(&text_message(ab.id, alice.id, "one")).await.unwrap();
        store.insert(&text_message(ab.id, alice.id, "two")).await.unwrap();
        store.insert(&text_message(cb.id, carol.id, "three")).await.unwrap();

        let senders = store.promote_pending(bob.id).await.unwrap();
        assert_eq!(senders.len(), 2);
        assert!(senders.contains(&alice.id));
        assert!(senders.contains(&carol.id));

        // Nothing left in `sent`; a second pass is a no-op.
        assert!(store.promote_pending(bob.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn pages_return_ascending_slices_of_newest_messages() {
        let (store, alice, bob) = seeded().await;
        let convo = store
            .find_or_create(ParticipantPair::new(alice.id, bob.id).unwrap())
            .await
            .unwrap();
        for i in 0..5 {
            store
                .insert(&text_message(convo.id, alice.id, &format!("m{i}")))
                .await
                .unwrap();
        }

        let page = store
            .page_for_conversation(convo.id, &PageRequest::new(1, 2))
            .await
            .unwrap();
        let contents: Vec<_> = page.iter().map(|m| m.content.clone().unwrap()).collect();
        assert_eq!(contents, vec!["m3", "m4"]);

        let page2 = store
            .page_for_conversation(convo.id, &PageRequest::new(2, 2))
            .await
            .unwrap();
        let contents: Vec<_> = page2.iter().map(|m| m.content.clone().unwrap()).collect();
        assert_eq!(contents, vec!["m1", "m2"]);
    }
}
