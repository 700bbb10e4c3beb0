//! # chatline-api
//!
//! HTTP layer for Chatline: REST handlers for conversations and message
//! history, the WebSocket upgrade for the realtime protocol, and the
//! `AppError` → HTTP response mapping.

pub mod dto;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use router::build_router;
pub use state::AppState;
