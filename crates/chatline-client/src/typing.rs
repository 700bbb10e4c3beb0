//! Typing state on both sides of the wire.
//!
//! The sender side emits one `typing-start` per burst of keystrokes and
//! synthesizes a `typing-stop` after a bounded inactivity window, so a
//! closed or crashed tab cannot leave the peer stuck on "typing". The
//! receiver side additionally expires a peer's indicator locally in case
//! the stop signal itself is lost — both signals are best-effort.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use uuid::Uuid;

/// Inactivity window after which a stop is synthesized.
pub const TYPING_IDLE_WINDOW: Duration = Duration::from_secs(3);

/// Own-side typing tracker driving start/stop emission.
#[derive(Debug, Clone)]
pub struct TypingTracker {
    window: Duration,
    deadline: Option<Instant>,
}

impl TypingTracker {
    /// Creates a tracker with the default inactivity window.
    pub fn new() -> Self {
        Self::with_window(TYPING_IDLE_WINDOW)
    }

    /// Creates a tracker with a custom inactivity window.
    pub fn with_window(window: Duration) -> Self {
        Self {
            window,
            deadline: None,
        }
    }

    /// Records a keystroke. Returns true when a `typing-start` should be
    /// emitted (the first keystroke of a burst).
    pub fn note_activity(&mut self, now: Instant) -> bool {
        let was_idle = self.deadline.is_none();
        self.deadline = Some(now + self.window);
        was_idle
    }

    /// Records that the message was sent or the input was cleared. Returns
    /// true when a `typing-stop` should be emitted.
    pub fn note_stop(&mut self) -> bool {
        self.deadline.take().is_some()
    }

    /// Polls the inactivity deadline. Returns true when the window elapsed
    /// and a synthesized `typing-stop` should be emitted.
    pub fn poll(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }

    /// Whether a typing burst is currently active.
    pub fn is_typing(&self) -> bool {
        self.deadline.is_some()
    }
}

impl Default for TypingTracker {
    fn default() -> Self {
        Self::new()
    }
}

/// Receiver-side indicator state per conversation.
#[derive(Debug, Clone, Default)]
pub struct TypingIndicator {
    /// Conversation → (typist, expiry).
    active: HashMap<Uuid, (Uuid, Instant)>,
}

impl TypingIndicator {
    /// Creates an empty indicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Applies a relayed `typing-start`.
    pub fn apply_start(&mut self, conversation_id: Uuid, sender_id: Uuid, now: Instant) {
        self.active
            .insert(conversation_id, (sender_id, now + TYPING_IDLE_WINDOW));
    }

    /// Applies a relayed `typing-stop`.
    pub fn apply_stop(&mut self, conversation_id: Uuid, sender_id: Uuid) {
        if let Some((typist, _)) = self.active.get(&conversation_id) {
            if *typist == sender_id {
                self.active.remove(&conversation_id);
            }
        }
    }

    /// Who is typing in the conversation, if the indicator has not expired.
    pub fn typist(&self, conversation_id: Uuid, now: Instant) -> Option<Uuid> {
        self.active
            .get(&conversation_id)
            .filter(|(_, expiry)| now < *expiry)
            .map(|(typist, _)| *typist)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_keystroke_of_a_burst_emits_start() {
        let mut tracker = TypingTracker::new();
        let now = Instant::now();

        assert!(tracker.note_activity(now));
        assert!(!tracker.note_activity(now + Duration::from_millis(200)));
        assert!(tracker.is_typing());
    }

    #[test]
    fn idle_window_synthesizes_stop_exactly_once() {
        let mut tracker = TypingTracker::new();
        let now = Instant::now();

        tracker.note_activity(now);
        assert!(!tracker.poll(now + Duration::from_secs(2)));
        assert!(tracker.poll(now + Duration::from_secs(3)));
        assert!(!tracker.poll(now + Duration::from_secs(4)));
        assert!(!tracker.is_typing());
    }

    #[test]
    fn activity_extends_the_deadline() {
        let mut tracker = TypingTracker::new();
        let now = Instant::now();

        tracker.note_activity(now);
        tracker.note_activity(now + Duration::from_secs(2));
        assert!(!tracker.poll(now + Duration::from_secs(4)));
        assert!(tracker.poll(now + Duration::from_secs(5)));
    }

    #[test]
    fn sending_clears_the_burst() {
        let mut tracker = TypingTracker::new();
        let now = Instant::now();

        tracker.note_activity(now);
        assert!(tracker.note_stop());
        assert!(!tracker.note_stop());
        assert!(tracker.note_activity(now + Duration::from_millis(100)));
    }

    #[test]
    fn peer_indicator_expires_without_a_stop_signal() {
        let mut indicator = TypingIndicator::new();
        let convo = Uuid::new_v4();
        let peer = Uuid::new_v4();
        let now = Instant::now();

        indicator.apply_start(convo, peer, now);
        assert_eq!(indicator.typist(convo, now + Duration::from_secs(1)), Some(peer));
        assert_eq!(indicator.typist(convo, now + Duration::from_secs(4)), None);
    }
}
