//! Conversation management.

pub mod service;

pub use service::{ConversationService, ConversationSummary};
