//! Per-conversation async locks.
//!
//! Serializes message creation and read-marking within one conversation so
//! that concurrent operations cannot interleave the last-message-pointer
//! update or double-broadcast a read transition.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use uuid::Uuid;

/// A lazily-populated map of conversation id → lock.
#[derive(Debug, Default)]
pub struct ConversationLocks {
    locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl ConversationLocks {
    /// Creates an empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for a conversation, creating it on first use.
    /// Entries are a pointer each and reused for the process lifetime.
    pub fn for_conversation(&self, conversation_id: Uuid) -> Arc<Mutex<()>> {
        self.locks
            .entry(conversation_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_conversation_yields_same_lock() {
        let locks = ConversationLocks::new();
        let id = Uuid::new_v4();
        let a = locks.for_conversation(id);
        let b = locks.for_conversation(id);
        assert!(Arc::ptr_eq(&a, &b));

        let other = locks.for_conversation(Uuid::new_v4());
        assert!(!Arc::ptr_eq(&a, &other));
    }
}
