//! Connection lifecycle: handles, pool, manager, heartbeat.

pub mod handle;
pub mod heartbeat;
pub mod manager;
pub mod pool;

pub use handle::{ConnectionHandle, ConnectionId};
pub use manager::ConnectionManager;
pub use pool::ConnectionPool;
