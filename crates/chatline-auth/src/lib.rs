//! # chatline-auth
//!
//! JWT claims, encoding, and validation for Chatline. Account creation and
//! session issuance live outside this service; this crate is the
//! connect-time credential check for HTTP requests and WebSocket upgrades.

pub mod jwt;

pub use jwt::{Claims, JwtDecoder, JwtEncoder};
