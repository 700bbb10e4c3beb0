//! # chatline-client
//!
//! Headless client-side state for Chatline. Merges locally-optimistic
//! message state with server-confirmed state (deduplicating by correlation
//! id), maintains a presence/unread view consistent with server broadcasts,
//! and owns the typing-inactivity timeout. UI layers render from this
//! model; nothing here talks to the network.

pub mod roster;
pub mod session;
pub mod timeline;
pub mod typing;

pub use roster::ConversationRoster;
pub use session::ClientSession;
pub use timeline::{LocalStatus, MessageTimeline, TimelineEntry};
pub use typing::{TypingIndicator, TypingTracker};
