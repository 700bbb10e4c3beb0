//! Room routing.

pub mod router;

pub use router::{Room, RoomRouter};
