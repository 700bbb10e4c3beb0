//! Store trait seams between the service layer and durable storage.
//!
//! Two providers implement these traits: the PostgreSQL repositories in
//! [`crate::repositories`] and the in-memory store in [`crate::memory`].
//! The service and realtime crates depend only on the traits.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use chatline_core::result::AppResult;
use chatline_core::types::pagination::PageRequest;
use chatline_entity::conversation::{Conversation, ParticipantPair};
use chatline_entity::message::{Message, MessageReceipt, NewMessage};
use chatline_entity::user::User;

/// Read and presence-bookkeeping access to user rows.
#[async_trait]
pub trait UserStore: Send + Sync + 'static {
    /// Find a user by ID.
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>>;

    /// Find several users by ID (missing IDs are silently skipped).
    async fn find_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>>;

    /// Persist the derived online flag and, on disconnect, the last-seen
    /// timestamp. Callers treat failures as best-effort.
    async fn set_presence(
        &self,
        id: Uuid,
        online: bool,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<()>;
}

/// Access to conversation rows.
#[async_trait]
pub trait ConversationStore: Send + Sync + 'static {
    /// Find the conversation for an unordered participant pair, creating it
    /// if absent. Idempotent.
    async fn find_or_create(&self, pair: ParticipantPair) -> AppResult<Conversation>;

    /// Find a conversation by ID.
    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>>;

    /// All conversations the user participates in, most recently active
    /// first.
    async fn conversations_for(&self, user_id: Uuid) -> AppResult<Vec<Conversation>>;

    /// Update the last-message pointer and activity timestamp.
    async fn touch(&self, id: Uuid, last_message_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;
}

/// Access to message rows and receipts.
#[async_trait]
pub trait MessageStore: Send + Sync + 'static {
    /// Persist a new message with status `sent`.
    async fn insert(&self, new: &NewMessage) -> AppResult<Message>;

    /// Find a message by ID.
    async fn find_message(&self, id: Uuid) -> AppResult<Option<Message>>;

    /// A page of a conversation's messages. The query walks backwards from
    /// the newest message but the page itself is returned in ascending
    /// creation order.
    async fn page_for_conversation(
        &self,
        conversation_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<Vec<Message>>;

    /// Advance a single message `sent → delivered`. Returns whether the row
    /// actually changed (false when already delivered or read).
    async fn mark_delivered(&self, message_id: Uuid) -> AppResult<bool>;

    /// Advance every non-read message in the conversation authored by
    /// `author_id` to `read`, recording a receipt for `reader_id`. Returns
    /// the number of messages that changed; zero makes the call a no-op.
    async fn mark_read(
        &self,
        conversation_id: Uuid,
        author_id: Uuid,
        reader_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<u64>;

    /// Advance every `sent` message addressed to `recipient_id` (authored by
    /// the other participant of any of their conversations) to `delivered`.
    /// Returns the distinct senders whose messages were promoted.
    async fn promote_pending(&self, recipient_id: Uuid) -> AppResult<Vec<Uuid>>;

    /// Count messages from `author_id` in the conversation that the other
    /// party has not read yet.
    async fn count_unread(&self, conversation_id: Uuid, author_id: Uuid) -> AppResult<i64>;

    /// Read receipts recorded for a message.
    async fn receipts_for(&self, message_id: Uuid) -> AppResult<Vec<MessageReceipt>>;
}
