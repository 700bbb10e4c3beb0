//! Concrete PostgreSQL repository implementations.

pub mod conversation;
pub mod message;
pub mod user;

pub use conversation::ConversationRepository;
pub use message::MessageRepository;
pub use user::UserRepository;
