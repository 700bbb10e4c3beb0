//! Engine-level tests over the in-memory store: delivery promotion,
//! backfill, presence broadcasts, read-marking, and room semantics.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::Receiver;
use tokio::time::timeout;
use uuid::Uuid;

use chatline_core::config::realtime::RealtimeConfig;
use chatline_database::memory::MemoryStore;
use chatline_database::store::{MessageStore, UserStore};
use chatline_entity::message::{MessageKind, MessageStatus};
use chatline_entity::user::User;
use chatline_realtime::event::ServerEvent;
use chatline_realtime::lifecycle::manager::SendMessageInput;
use chatline_realtime::server::RealtimeEngine;
use chatline_service::{ConversationService, MessageService};

struct TestBed {
    store: Arc<MemoryStore>,
    engine: RealtimeEngine,
}

impl TestBed {
    fn new() -> Self {
        let store = Arc::new(MemoryStore::new());
        let users: Arc<dyn UserStore> = store.clone();
        let messages = Arc::new(MessageService::new(
            store.clone(),
            store.clone(),
            store.clone(),
            5000,
        ));
        let conversations = Arc::new(ConversationService::new(
            store.clone(),
            store.clone(),
            store.clone(),
        ));
        let engine = RealtimeEngine::new(
            RealtimeConfig::default(),
            users,
            messages,
            conversations,
        );
        Self { store, engine }
    }

    async fn connect(&self, user: &User) -> (Uuid, Receiver<ServerEvent>) {
        let (handle, rx) = self
            .engine
            .connect(user.id, Uuid::new_v4(), user.username.clone())
            .await;
        (handle.id, rx)
    }

    async fn conversation(&self, a: &User, b: &User) -> Uuid {
        let conversations = ConversationService::new(
            self.store.clone(),
            self.store.clone(),
            self.store.clone(),
        );
        conversations
            .open_conversation(a.id, b.id)
            .await
            .unwrap()
            .id
    }
}

/// Waits up to a second for an event matching the predicate, discarding
/// everything else (presence chatter, pings).
async fn expect_event<F>(rx: &mut Receiver<ServerEvent>, pred: F) -> ServerEvent
where
    F: Fn(&ServerEvent) -> bool,
{
    loop {
        let event = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("channel closed while waiting for event");
        if pred(&event) {
            return event;
        }
    }
}

/// Asserts no matching event arrives within a short window.
async fn expect_silence<F>(rx: &mut Receiver<ServerEvent>, pred: F)
where
    F: Fn(&ServerEvent) -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_millis(150);
    loop {
        match timeout(Duration::from_millis(150), rx.recv()).await {
            Ok(Some(event)) => {
                assert!(!pred(&event), "unexpected event: {event:?}");
                if tokio::time::Instant::now() >= deadline {
                    return;
                }
            }
            _ => return,
        }
    }
}

fn send_message_json(conversation_id: Uuid, recipient_id: Uuid, correlation_id: Uuid, content: &str) -> String {
    format!(
        r#"{{"type":"send-message","conversation_id":"{conversation_id}","content":"{content}","recipient_id":"{recipient_id}","correlation_id":"{correlation_id}"}}"#
    )
}

#[tokio::test]
async fn fresh_connection_receives_presence_snapshot() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;

    let (_alice_conn, _alice_rx) = bed.connect(&alice).await;
    let (_bob_conn, mut bob_rx) = bed.connect(&bob).await;

    let snapshot = expect_event(&mut bob_rx, |e| {
        matches!(e, ServerEvent::PresenceSnapshot { .. })
    })
    .await;
    match snapshot {
        ServerEvent::PresenceSnapshot { user_ids } => {
            assert!(user_ids.contains(&alice.id));
            assert!(user_ids.contains(&bob.id));
        }
        _ => unreachable!(),
    }
}

#[tokio::test]
async fn online_recipient_gets_delivered_before_first_broadcast() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;
    let conversation_id = bed.conversation(&alice, &bob).await;

    let (alice_conn, mut alice_rx) = bed.connect(&alice).await;
    let (_bob_conn, mut bob_rx) = bed.connect(&bob).await;

    let correlation_id = Uuid::new_v4();
    bed.engine
        .handle_event(
            alice_conn,
            &send_message_json(conversation_id, bob.id, correlation_id, "hi"),
        )
        .await;

    // Both the recipient's copy and the sender's confirmation already carry
    // `delivered`; the wire never shows `sent` for an online recipient.
    for rx in [&mut alice_rx, &mut bob_rx] {
        let event = expect_event(rx, |e| matches!(e, ServerEvent::MessageCreated { .. })).await;
        match event {
            ServerEvent::MessageCreated {
                message,
                correlation_id: echoed,
            } => {
                assert_eq!(echoed, correlation_id);
                assert_eq!(message.message.status, MessageStatus::Delivered);
                assert_eq!(message.sender.username, "alice");
            }
            _ => unreachable!(),
        }
    }
}

#[tokio::test]
async fn offline_recipient_message_stays_sent_until_backfill() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;
    let conversation_id = bed.conversation(&alice, &bob).await;

    let (_alice_conn, mut alice_rx) = bed.connect(&alice).await;

    // Two messages while bob is offline; both persist as `sent`.
    for content in ["one", "two"] {
        let view = bed
            .engine
            .lifecycle
            .send_message(
                alice.id,
                SendMessageInput {
                    conversation_id,
                    kind: MessageKind::Text,
                    content: Some(content.to_string()),
                    media_url: None,
                    correlation_id: Uuid::new_v4(),
                },
            )
            .await
            .unwrap();
        assert_eq!(view.message.status, MessageStatus::Sent);
    }

    // Bob reconnects; backfill promotes both and notifies alice exactly
    // once, not once per message.
    let (_bob_conn, _bob_rx) = bed.connect(&bob).await;

    let event = expect_event(&mut alice_rx, |e| {
        matches!(e, ServerEvent::MessageDelivered { .. })
    })
    .await;
    match event {
        ServerEvent::MessageDelivered { recipient_id } => assert_eq!(recipient_id, bob.id),
        _ => unreachable!(),
    }
    expect_silence(&mut alice_rx, |e| {
        matches!(e, ServerEvent::MessageDelivered { .. })
    })
    .await;

    assert!(bed.store.promote_pending(bob.id).await.unwrap().is_empty());
}

#[tokio::test]
async fn presence_offline_fires_once_after_last_tab_closes() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;

    let (_alice_conn, mut alice_rx) = bed.connect(&alice).await;
    let (bob_tab1, _rx1) = bed.connect(&bob).await;
    let (bob_tab2, _rx2) = bed.connect(&bob).await;

    bed.engine.disconnect(&bob_tab1).await;
    expect_silence(&mut alice_rx, |e| {
        matches!(e, ServerEvent::PresenceOffline { .. })
    })
    .await;
    assert!(bed.engine.presence.is_online(bob.id));

    bed.engine.disconnect(&bob_tab2).await;
    let event = expect_event(&mut alice_rx, |e| {
        matches!(e, ServerEvent::PresenceOffline { .. })
    })
    .await;
    match event {
        ServerEvent::PresenceOffline { user_id, .. } => assert_eq!(user_id, bob.id),
        _ => unreachable!(),
    }
    expect_silence(&mut alice_rx, |e| {
        matches!(e, ServerEvent::PresenceOffline { .. })
    })
    .await;
    assert!(!bed.engine.presence.is_online(bob.id));
}

#[tokio::test]
async fn mark_read_broadcasts_once_and_is_idempotent() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;
    let conversation_id = bed.conversation(&alice, &bob).await;

    let (alice_conn, mut alice_rx) = bed.connect(&alice).await;
    let (bob_conn, _bob_rx) = bed.connect(&bob).await;

    bed.engine
        .handle_event(
            alice_conn,
            &send_message_json(conversation_id, bob.id, Uuid::new_v4(), "hello"),
        )
        .await;

    let mark_read = format!(
        r#"{{"type":"mark-read","conversation_id":"{conversation_id}","other_party_id":"{}"}}"#,
        alice.id
    );
    bed.engine.handle_event(bob_conn, &mark_read).await;
    bed.engine.handle_event(bob_conn, &mark_read).await;

    let event = expect_event(&mut alice_rx, |e| {
        matches!(e, ServerEvent::MessageRead { .. })
    })
    .await;
    match event {
        ServerEvent::MessageRead {
            conversation_id: convo,
            reader_id,
        } => {
            assert_eq!(convo, conversation_id);
            assert_eq!(reader_id, bob.id);
        }
        _ => unreachable!(),
    }
    expect_silence(&mut alice_rx, |e| {
        matches!(e, ServerEvent::MessageRead { .. })
    })
    .await;
}

#[tokio::test]
async fn non_participant_send_is_rejected_to_origin_only() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;
    let mallory = bed.store.add_user("mallory").await;
    let conversation_id = bed.conversation(&alice, &bob).await;

    let (_alice_conn, mut alice_rx) = bed.connect(&alice).await;
    let (mallory_conn, mut mallory_rx) = bed.connect(&mallory).await;

    bed.engine
        .handle_event(
            mallory_conn,
            &send_message_json(conversation_id, bob.id, Uuid::new_v4(), "intrusion"),
        )
        .await;

    let event = expect_event(&mut mallory_rx, |e| matches!(e, ServerEvent::Error { .. })).await;
    match event {
        ServerEvent::Error { code, .. } => assert_eq!(code, "AUTHORIZATION"),
        _ => unreachable!(),
    }
    expect_silence(&mut alice_rx, |e| {
        matches!(e, ServerEvent::MessageCreated { .. })
    })
    .await;
}

#[tokio::test]
async fn typing_is_relayed_to_the_room_excluding_the_sender() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;
    let conversation_id = bed.conversation(&alice, &bob).await;

    let (alice_conn, mut alice_rx) = bed.connect(&alice).await;
    let (bob_conn, mut bob_rx) = bed.connect(&bob).await;

    let join = format!(r#"{{"type":"join-conversation","conversation_id":"{conversation_id}"}}"#);
    bed.engine.handle_event(alice_conn, &join).await;
    bed.engine.handle_event(bob_conn, &join).await;

    let typing = format!(
        r#"{{"type":"typing-start","conversation_id":"{conversation_id}","recipient_id":"{}"}}"#,
        bob.id
    );
    bed.engine.handle_event(alice_conn, &typing).await;

    let event = expect_event(&mut bob_rx, |e| matches!(e, ServerEvent::TypingStart { .. })).await;
    match event {
        ServerEvent::TypingStart { sender_id, .. } => assert_eq!(sender_id, alice.id),
        _ => unreachable!(),
    }
    expect_silence(&mut alice_rx, |e| {
        matches!(e, ServerEvent::TypingStart { .. })
    })
    .await;
}

#[tokio::test]
async fn joining_a_foreign_conversation_is_rejected() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;
    let mallory = bed.store.add_user("mallory").await;
    let conversation_id = bed.conversation(&alice, &bob).await;

    let (mallory_conn, mut mallory_rx) = bed.connect(&mallory).await;

    let join = format!(r#"{{"type":"join-conversation","conversation_id":"{conversation_id}"}}"#);
    bed.engine.handle_event(mallory_conn, &join).await;

    let event = expect_event(&mut mallory_rx, |e| matches!(e, ServerEvent::Error { .. })).await;
    match event {
        ServerEvent::Error { code, .. } => assert_eq!(code, "AUTHORIZATION"),
        _ => unreachable!(),
    }
    assert_eq!(bed.engine.rooms.active_conversation(mallory_conn), None);
}

#[tokio::test]
async fn switching_conversations_evicts_the_previous_room() {
    let bed = TestBed::new();
    let alice = bed.store.add_user("alice").await;
    let bob = bed.store.add_user("bob").await;
    let carol = bed.store.add_user("carol").await;
    let with_bob = bed.conversation(&alice, &bob).await;
    let with_carol = bed.conversation(&alice, &carol).await;

    let (alice_conn, _alice_rx) = bed.connect(&alice).await;

    for conversation_id in [with_bob, with_carol] {
        let join =
            format!(r#"{{"type":"join-conversation","conversation_id":"{conversation_id}"}}"#);
        bed.engine.handle_event(alice_conn, &join).await;
    }

    assert_eq!(
        bed.engine.rooms.active_conversation(alice_conn),
        Some(with_carol)
    );
}
