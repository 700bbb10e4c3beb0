//! # chatline-database
//!
//! Durable storage for Chatline: the store trait seams consumed by the
//! service layer, concrete PostgreSQL repository implementations, an
//! in-memory provider for development and tests, connection pool
//! management, and the migration runner.

pub mod connection;
pub mod memory;
pub mod migration;
pub mod repositories;
pub mod store;

pub use connection::DatabasePool;
pub use memory::MemoryStore;
pub use store::{ConversationStore, MessageStore, UserStore};
