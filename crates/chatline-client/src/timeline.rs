//! Per-conversation message timeline with optimistic reconciliation.
//!
//! On submit the client inserts a placeholder carrying a locally-generated
//! correlation id and the `sending` pseudo-status, then sends the create
//! intent with that id. The server's confirmation is matched against
//! pending entries by persisted id first, else by correlation id, and
//! replaces the placeholder in place — never appending a duplicate and
//! never reordering the sequence. Correlation ids are mandatory on both
//! sides, so no content/timestamp heuristic is needed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use chatline_entity::message::{MessageKind, MessageStatus, MessageView};

/// Client-visible message status: the server's lifecycle plus the two
/// client-only pseudo-states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocalStatus {
    /// Optimistically inserted, not yet confirmed.
    Sending,
    /// The create intent was rejected; stays visible until the user retries
    /// or discards. Never retried automatically.
    Failed,
    /// Confirmed, recipient offline.
    Sent,
    /// Confirmed, reached the recipient.
    Delivered,
    /// Acknowledged as viewed.
    Read,
}

impl From<MessageStatus> for LocalStatus {
    fn from(status: MessageStatus) -> Self {
        match status {
            MessageStatus::Sent => Self::Sent,
            MessageStatus::Delivered => Self::Delivered,
            MessageStatus::Read => Self::Read,
        }
    }
}

/// One logical message in the ordered sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineEntry {
    /// Server-assigned id, present once confirmed.
    pub message_id: Option<Uuid>,
    /// Correlation id: locally generated for optimistic entries, kept for
    /// bookkeeping on entries learned from the server.
    pub correlation_id: Uuid,
    /// Authoring user.
    pub sender_id: Uuid,
    /// Content kind.
    pub kind: MessageKind,
    /// Textual content.
    pub content: Option<String>,
    /// Media reference.
    pub media_url: Option<String>,
    /// Creation time (local clock until confirmed).
    pub created_at: DateTime<Utc>,
    /// Current client-visible status.
    pub status: LocalStatus,
}

impl TimelineEntry {
    fn from_view(view: &MessageView, correlation_id: Uuid) -> Self {
        Self {
            message_id: Some(view.message.id),
            correlation_id,
            sender_id: view.message.sender_id,
            kind: view.message.kind,
            content: view.message.content.clone(),
            media_url: view.message.media_url.clone(),
            created_at: view.message.created_at,
            status: view.message.status.into(),
        }
    }
}

/// The ordered message sequence of one conversation, as rendered.
#[derive(Debug, Clone)]
pub struct MessageTimeline {
    /// The local user.
    self_id: Uuid,
    /// The conversation this timeline belongs to.
    pub conversation_id: Uuid,
    entries: Vec<TimelineEntry>,
}

impl MessageTimeline {
    /// Creates an empty timeline.
    pub fn new(conversation_id: Uuid, self_id: Uuid) -> Self {
        Self {
            self_id,
            conversation_id,
            entries: Vec::new(),
        }
    }

    /// Replaces the timeline with a fetched history page. Pending optimistic
    /// entries are re-appended behind the history so an in-flight send
    /// survives a refetch.
    pub fn load_history(&mut self, views: &[MessageView]) {
        let pending: Vec<TimelineEntry> = self
            .entries
            .iter()
            .filter(|e| matches!(e.status, LocalStatus::Sending | LocalStatus::Failed))
            .cloned()
            .collect();

        self.entries = views
            .iter()
            .map(|view| TimelineEntry::from_view(view, Uuid::new_v4()))
            .collect();
        self.entries.extend(pending);
    }

    /// Inserts an optimistic placeholder and returns its correlation id.
    pub fn push_optimistic(
        &mut self,
        kind: MessageKind,
        content: Option<String>,
        media_url: Option<String>,
    ) -> Uuid {
        let correlation_id = Uuid::new_v4();
        self.entries.push(TimelineEntry {
            message_id: None,
            correlation_id,
            sender_id: self.self_id,
            kind,
            content,
            media_url,
            created_at: Utc::now(),
            status: LocalStatus::Sending,
        });
        correlation_id
    }

    /// Folds a server confirmation into the sequence.
    ///
    /// Matching order: exact persisted id, else correlation id. A match is
    /// replaced in place, keeping the submission order even when
    /// confirmations arrive out of order; no match appends (messages from
    /// the other party or another of our own connections).
    pub fn apply_confirmation(&mut self, view: &MessageView, correlation_id: Uuid) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.message_id == Some(view.message.id))
        {
            entry.status = view.message.status.into();
            return;
        }

        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.message_id.is_none() && e.correlation_id == correlation_id)
        {
            *entry = TimelineEntry::from_view(view, correlation_id);
            return;
        }

        self.entries
            .push(TimelineEntry::from_view(view, correlation_id));
    }

    /// Marks a pending placeholder as failed after a rejected send.
    pub fn mark_failed(&mut self, correlation_id: Uuid) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.correlation_id == correlation_id && e.status == LocalStatus::Sending)
        {
            entry.status = LocalStatus::Failed;
        }
    }

    /// Applies a delivered notification: every own confirmed-but-undelivered
    /// message advances. Statuses are rewritten in place; entries are never
    /// reordered or duplicated.
    pub fn mark_own_delivered(&mut self) {
        for entry in &mut self.entries {
            if entry.sender_id == self.self_id && entry.status == LocalStatus::Sent {
                entry.status = LocalStatus::Delivered;
            }
        }
    }

    /// Applies a read notification from the other party: every own
    /// non-terminal confirmed message becomes read.
    pub fn apply_read(&mut self, reader_id: Uuid) {
        if reader_id == self.self_id {
            return;
        }
        for entry in &mut self.entries {
            if entry.sender_id == self.self_id
                && matches!(entry.status, LocalStatus::Sent | LocalStatus::Delivered)
            {
                entry.status = LocalStatus::Read;
            }
        }
    }

    /// The ordered entries.
    pub fn entries(&self) -> &[TimelineEntry] {
        &self.entries
    }

    /// The newest entry, if any.
    pub fn last(&self) -> Option<&TimelineEntry> {
        self.entries.last()
    }
}
