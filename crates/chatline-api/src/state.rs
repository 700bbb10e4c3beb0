//! Shared application state injected into all handlers.

use std::sync::Arc;

use chatline_auth::JwtDecoder;
use chatline_core::config::AppConfig;
use chatline_realtime::RealtimeEngine;
use chatline_service::{ConversationService, MessageService};

/// State shared across the router.
#[derive(Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// JWT decoder for request and upgrade authentication.
    pub jwt_decoder: Arc<JwtDecoder>,
    /// Conversation service.
    pub conversations: Arc<ConversationService>,
    /// Message service.
    pub messages: Arc<MessageService>,
    /// Real-time engine.
    pub realtime: Arc<RealtimeEngine>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState").finish()
    }
}
