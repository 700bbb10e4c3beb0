//! Message lifecycle: per-conversation serialization and fan-out.

pub mod locks;
pub mod manager;

pub use manager::{MessageLifecycle, SendMessageInput};
