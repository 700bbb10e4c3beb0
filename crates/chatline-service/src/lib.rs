//! # chatline-service
//!
//! Domain services over the store traits: conversation find-or-create and
//! listing, the durable half of the message lifecycle, and content
//! validation. The realtime engine layers presence decisions and fan-out on
//! top of these services.

pub mod conversation;
pub mod message;
pub mod validate;

pub use conversation::service::{ConversationService, ConversationSummary};
pub use message::service::MessageService;
