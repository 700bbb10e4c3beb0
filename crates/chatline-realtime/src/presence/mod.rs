//! Presence tracking.

pub mod registry;

pub use registry::{PresenceRegistry, RegisterOutcome, UnregisterOutcome};
