//! Conversation list state: presence view and unread counts.
//!
//! The unread count for a conversation increments on inbound notification
//! events only when the conversation is not the currently-open one and the
//! message is not self-authored; it resets on a read confirmation for the
//! conversation or on opening it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One sidebar row.
#[derive(Debug, Clone)]
pub struct RosterEntry {
    /// The conversation.
    pub conversation_id: Uuid,
    /// The other participant.
    pub other_id: Uuid,
    /// Ordering timestamp.
    pub last_activity_at: DateTime<Utc>,
    /// Preview of the most recent message.
    pub last_preview: Option<String>,
    /// Unread messages from the other participant.
    pub unread_count: u32,
}

/// The aggregate conversation-list view.
#[derive(Debug, Clone)]
pub struct ConversationRoster {
    self_id: Uuid,
    open_conversation: Option<Uuid>,
    online: HashSet<Uuid>,
    entries: HashMap<Uuid, RosterEntry>,
}

impl ConversationRoster {
    /// Creates an empty roster for the local user.
    pub fn new(self_id: Uuid) -> Self {
        Self {
            self_id,
            open_conversation: None,
            online: HashSet::new(),
            entries: HashMap::new(),
        }
    }

    /// Seeds or updates a conversation row from a server listing.
    pub fn upsert(
        &mut self,
        conversation_id: Uuid,
        other_id: Uuid,
        last_activity_at: DateTime<Utc>,
        last_preview: Option<String>,
        unread_count: u32,
    ) {
        self.entries.insert(
            conversation_id,
            RosterEntry {
                conversation_id,
                other_id,
                last_activity_at,
                last_preview,
                unread_count,
            },
        );
    }

    /// Replaces the presence view with a server snapshot.
    pub fn apply_snapshot(&mut self, user_ids: &[Uuid]) {
        self.online = user_ids.iter().copied().collect();
    }

    /// Applies an incremental presence-online event.
    pub fn apply_online(&mut self, user_id: Uuid) {
        self.online.insert(user_id);
    }

    /// Applies an incremental presence-offline event.
    pub fn apply_offline(&mut self, user_id: Uuid) {
        self.online.remove(&user_id);
    }

    /// Whether an identity is currently online.
    pub fn is_online(&self, user_id: Uuid) -> bool {
        self.online.contains(&user_id)
    }

    /// Folds an inbound message notification into the list.
    pub fn note_message(
        &mut self,
        conversation_id: Uuid,
        sender_id: Uuid,
        created_at: DateTime<Utc>,
        preview: Option<String>,
    ) {
        let is_open = self.open_conversation == Some(conversation_id);
        let entry = self
            .entries
            .entry(conversation_id)
            .or_insert_with(|| RosterEntry {
                conversation_id,
                other_id: sender_id,
                last_activity_at: created_at,
                last_preview: None,
                unread_count: 0,
            });

        entry.last_activity_at = created_at;
        entry.last_preview = preview;
        if !is_open && sender_id != self.self_id {
            entry.unread_count += 1;
        }
    }

    /// Resets the unread count after a read confirmation.
    pub fn note_read(&mut self, conversation_id: Uuid) {
        if let Some(entry) = self.entries.get_mut(&conversation_id) {
            entry.unread_count = 0;
        }
    }

    /// Marks a conversation as the open one, clearing its unread count.
    pub fn open(&mut self, conversation_id: Uuid) {
        self.open_conversation = Some(conversation_id);
        self.note_read(conversation_id);
    }

    /// Clears the open conversation.
    pub fn close(&mut self) {
        self.open_conversation = None;
    }

    /// The currently-open conversation, if any.
    pub fn open_conversation(&self) -> Option<Uuid> {
        self.open_conversation
    }

    /// The other participant of a conversation, if known.
    pub fn other_of(&self, conversation_id: Uuid) -> Option<Uuid> {
        self.entries.get(&conversation_id).map(|e| e.other_id)
    }

    /// The conversation whose peer is `other_id`, if known.
    pub fn conversation_with(&self, other_id: Uuid) -> Option<Uuid> {
        self.entries
            .values()
            .find(|e| e.other_id == other_id)
            .map(|e| e.conversation_id)
    }

    /// Unread count for a conversation.
    pub fn unread_count(&self, conversation_id: Uuid) -> u32 {
        self.entries
            .get(&conversation_id)
            .map(|e| e.unread_count)
            .unwrap_or(0)
    }

    /// Rows ordered by most recent activity.
    pub fn ordered(&self) -> Vec<&RosterEntry> {
        let mut rows: Vec<&RosterEntry> = self.entries.values().collect();
        rows.sort_by(|a, b| b.last_activity_at.cmp(&a.last_activity_at));
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roster_with_conversation() -> (ConversationRoster, Uuid, Uuid) {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let convo = Uuid::new_v4();
        let mut roster = ConversationRoster::new(me);
        roster.upsert(convo, peer, Utc::now(), None, 0);
        (roster, convo, peer)
    }

    #[test]
    fn inbound_messages_increment_unread_only_when_not_open() {
        let (mut roster, convo, peer) = roster_with_conversation();

        roster.note_message(convo, peer, Utc::now(), Some("hey".into()));
        assert_eq!(roster.unread_count(convo), 1);

        roster.open(convo);
        assert_eq!(roster.unread_count(convo), 0);

        roster.note_message(convo, peer, Utc::now(), Some("again".into()));
        assert_eq!(roster.unread_count(convo), 0);
    }

    #[test]
    fn own_messages_never_count_as_unread() {
        let (mut roster, convo, _peer) = roster_with_conversation();
        let me = roster.self_id;

        roster.note_message(convo, me, Utc::now(), Some("mine".into()));
        assert_eq!(roster.unread_count(convo), 0);
    }

    #[test]
    fn read_confirmation_resets_unread() {
        let (mut roster, convo, peer) = roster_with_conversation();

        roster.note_message(convo, peer, Utc::now(), None);
        roster.note_message(convo, peer, Utc::now(), None);
        assert_eq!(roster.unread_count(convo), 2);

        roster.note_read(convo);
        assert_eq!(roster.unread_count(convo), 0);
    }

    #[test]
    fn presence_follows_snapshot_and_increments() {
        let me = Uuid::new_v4();
        let mut roster = ConversationRoster::new(me);
        let alice = Uuid::new_v4();
        let bob = Uuid::new_v4();

        roster.apply_snapshot(&[alice]);
        assert!(roster.is_online(alice));
        assert!(!roster.is_online(bob));

        roster.apply_online(bob);
        assert!(roster.is_online(bob));
        roster.apply_offline(alice);
        assert!(!roster.is_online(alice));
    }

    #[test]
    fn rows_are_ordered_by_recent_activity() {
        let me = Uuid::new_v4();
        let mut roster = ConversationRoster::new(me);
        let older = Uuid::new_v4();
        let newer = Uuid::new_v4();
        let peer1 = Uuid::new_v4();
        let peer2 = Uuid::new_v4();

        let base = Utc::now();
        roster.upsert(older, peer1, base, None, 0);
        roster.upsert(newer, peer2, base + chrono::Duration::seconds(5), None, 0);

        let ordered = roster.ordered();
        assert_eq!(ordered[0].conversation_id, newer);
        assert_eq!(ordered[1].conversation_id, older);
    }
}
