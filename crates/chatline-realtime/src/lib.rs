//! # chatline-realtime
//!
//! Real-time delivery and presence engine for Chatline. Provides:
//!
//! - Connection management over per-connection outbound channels
//! - A reference-counted presence registry (single source of truth for
//!   "who is online")
//! - Room routing: one lifetime personal room per connection, at most one
//!   conversation room at a time
//! - The message lifecycle state machine (`sent → delivered → read`)
//! - Reconnect delivery backfill
//! - Ephemeral typing relay
//! - Ping/pong heartbeat and lightweight metrics

pub mod backfill;
pub mod connection;
pub mod event;
pub mod lifecycle;
pub mod metrics;
pub mod presence;
pub mod room;
pub mod server;
pub mod typing;

pub use backfill::DeliveryBackfill;
pub use connection::manager::ConnectionManager;
pub use event::{ClientEvent, ServerEvent};
pub use lifecycle::manager::MessageLifecycle;
pub use presence::registry::PresenceRegistry;
pub use room::router::{Room, RoomRouter};
pub use server::RealtimeEngine;
