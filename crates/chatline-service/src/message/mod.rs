//! Message lifecycle — durable half.

pub mod service;

pub use service::MessageService;
