//! Client session reducer: folds server events into view state and
//! produces the client intents for user actions.

use std::collections::HashMap;
use std::time::Instant;

use tracing::debug;
use uuid::Uuid;

use chatline_entity::message::MessageKind;
use chatline_realtime::event::{ClientEvent, ServerEvent};

use crate::roster::ConversationRoster;
use crate::timeline::MessageTimeline;
use crate::typing::TypingIndicator;

/// All client-local state for one connected user.
#[derive(Debug)]
pub struct ClientSession {
    self_id: Uuid,
    /// Conversation-list view.
    pub roster: ConversationRoster,
    /// Per-conversation ordered sequences.
    timelines: HashMap<Uuid, MessageTimeline>,
    /// Peer typing indicators.
    pub typing: TypingIndicator,
}

impl ClientSession {
    /// Creates a session for the local user.
    pub fn new(self_id: Uuid) -> Self {
        Self {
            self_id,
            roster: ConversationRoster::new(self_id),
            timelines: HashMap::new(),
            typing: TypingIndicator::new(),
        }
    }

    /// The timeline for a conversation, created on first access.
    pub fn timeline_mut(&mut self, conversation_id: Uuid) -> &mut MessageTimeline {
        let self_id = self.self_id;
        self.timelines
            .entry(conversation_id)
            .or_insert_with(|| MessageTimeline::new(conversation_id, self_id))
    }

    /// The timeline for a conversation, if it exists.
    pub fn timeline(&self, conversation_id: Uuid) -> Option<&MessageTimeline> {
        self.timelines.get(&conversation_id)
    }

    /// Opens a conversation: updates the roster and returns the join intent.
    pub fn open_conversation(&mut self, conversation_id: Uuid) -> ClientEvent {
        self.roster.open(conversation_id);
        ClientEvent::JoinConversation { conversation_id }
    }

    /// Closes the open conversation, returning the leave intent.
    pub fn close_conversation(&mut self) -> Option<ClientEvent> {
        let conversation_id = self.roster.open_conversation()?;
        self.roster.close();
        Some(ClientEvent::LeaveConversation { conversation_id })
    }

    /// Prepares a send: inserts the optimistic placeholder and returns the
    /// intent carrying its correlation id.
    pub fn prepare_send(
        &mut self,
        conversation_id: Uuid,
        recipient_id: Uuid,
        kind: MessageKind,
        content: Option<String>,
        media_url: Option<String>,
    ) -> ClientEvent {
        let correlation_id = self.timeline_mut(conversation_id).push_optimistic(
            kind,
            content.clone(),
            media_url.clone(),
        );
        ClientEvent::SendMessage {
            conversation_id,
            kind,
            content,
            media_url,
            recipient_id,
            correlation_id,
        }
    }

    /// The mark-read intent for the open conversation's peer.
    pub fn prepare_mark_read(&self, conversation_id: Uuid) -> Option<ClientEvent> {
        let other_party_id = self.roster.other_of(conversation_id)?;
        Some(ClientEvent::MarkRead {
            conversation_id,
            other_party_id,
        })
    }

    /// Folds one server event into the local view.
    pub fn apply(&mut self, event: ServerEvent) {
        match event {
            ServerEvent::PresenceSnapshot { user_ids } => {
                self.roster.apply_snapshot(&user_ids);
            }
            ServerEvent::PresenceOnline { user_id } => {
                self.roster.apply_online(user_id);
            }
            ServerEvent::PresenceOffline { user_id, .. } => {
                self.roster.apply_offline(user_id);
            }
            ServerEvent::MessageCreated {
                message,
                correlation_id,
            } => {
                let conversation_id = message.message.conversation_id;
                let sender_id = message.message.sender_id;
                let created_at = message.message.created_at;
                let preview = message.message.content.clone();

                self.timeline_mut(conversation_id)
                    .apply_confirmation(&message, correlation_id);
                self.roster
                    .note_message(conversation_id, sender_id, created_at, preview);
            }
            ServerEvent::MessageDelivered { recipient_id } => {
                if let Some(conversation_id) = self.roster.conversation_with(recipient_id) {
                    self.timeline_mut(conversation_id).mark_own_delivered();
                }
            }
            ServerEvent::MessageRead {
                conversation_id,
                reader_id,
            } => {
                self.timeline_mut(conversation_id).apply_read(reader_id);
                self.roster.note_read(conversation_id);
            }
            ServerEvent::TypingStart {
                conversation_id,
                sender_id,
            } => {
                self.typing
                    .apply_start(conversation_id, sender_id, Instant::now());
            }
            ServerEvent::TypingStop {
                conversation_id,
                sender_id,
            } => {
                self.typing.apply_stop(conversation_id, sender_id);
            }
            ServerEvent::Ping { .. } => {}
            ServerEvent::Error { code, message } => {
                debug!(code = %code, message = %message, "Server rejected an intent");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chatline_entity::message::{Message, MessageStatus, MessageView};
    use chatline_entity::user::UserProfile;
    use chrono::Utc;

    use crate::timeline::LocalStatus;

    fn created_event(
        conversation_id: Uuid,
        sender_id: Uuid,
        content: &str,
        status: MessageStatus,
        correlation_id: Uuid,
    ) -> ServerEvent {
        let now = Utc::now();
        ServerEvent::MessageCreated {
            message: MessageView::new(
                Message {
                    id: Uuid::new_v4(),
                    conversation_id,
                    sender_id,
                    kind: MessageKind::Text,
                    content: Some(content.to_string()),
                    media_url: None,
                    status,
                    created_at: now,
                    updated_at: now,
                },
                UserProfile {
                    id: sender_id,
                    username: "peer".to_string(),
                    display_name: None,
                    avatar_url: None,
                },
            ),
            correlation_id,
        }
    }

    #[test]
    fn send_confirmation_roundtrip_keeps_one_entry() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let convo = Uuid::new_v4();
        let mut session = ClientSession::new(me);
        session.roster.upsert(convo, peer, Utc::now(), None, 0);

        let intent = session.prepare_send(
            convo,
            peer,
            MessageKind::Text,
            Some("hello".into()),
            None,
        );
        let ClientEvent::SendMessage { correlation_id, .. } = intent else {
            panic!("expected send intent");
        };

        session.apply(created_event(convo, me, "hello", MessageStatus::Delivered, correlation_id));

        let timeline = session.timeline(convo).unwrap();
        assert_eq!(timeline.entries().len(), 1);
        assert_eq!(timeline.entries()[0].status, LocalStatus::Delivered);
        // Own echo never bumps the unread count.
        assert_eq!(session.roster.unread_count(convo), 0);
    }

    #[test]
    fn inbound_message_in_background_conversation_counts_unread() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let convo = Uuid::new_v4();
        let mut session = ClientSession::new(me);
        session.roster.upsert(convo, peer, Utc::now(), None, 0);

        session.apply(created_event(convo, peer, "ping", MessageStatus::Delivered, Uuid::new_v4()));
        assert_eq!(session.roster.unread_count(convo), 1);

        // Opening resets; a read confirmation reaching another tab would too.
        session.open_conversation(convo);
        assert_eq!(session.roster.unread_count(convo), 0);
    }

    #[test]
    fn delivered_notification_targets_the_peer_conversation() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let convo = Uuid::new_v4();
        let mut session = ClientSession::new(me);
        session.roster.upsert(convo, peer, Utc::now(), None, 0);

        let intent = session.prepare_send(convo, peer, MessageKind::Text, Some("hi".into()), None);
        let ClientEvent::SendMessage { correlation_id, .. } = intent else {
            panic!("expected send intent");
        };
        session.apply(created_event(convo, me, "hi", MessageStatus::Sent, correlation_id));

        session.apply(ServerEvent::MessageDelivered { recipient_id: peer });

        let timeline = session.timeline(convo).unwrap();
        assert_eq!(timeline.entries()[0].status, LocalStatus::Delivered);
    }

    #[test]
    fn read_event_finishes_the_lifecycle() {
        let me = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let convo = Uuid::new_v4();
        let mut session = ClientSession::new(me);
        session.roster.upsert(convo, peer, Utc::now(), None, 0);

        let intent = session.prepare_send(convo, peer, MessageKind::Text, Some("hi".into()), None);
        let ClientEvent::SendMessage { correlation_id, .. } = intent else {
            panic!("expected send intent");
        };
        session.apply(created_event(convo, me, "hi", MessageStatus::Delivered, correlation_id));
        session.apply(ServerEvent::MessageRead {
            conversation_id: convo,
            reader_id: peer,
        });

        assert_eq!(
            session.timeline(convo).unwrap().entries()[0].status,
            LocalStatus::Read
        );
    }
}
