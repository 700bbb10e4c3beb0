//! Router assembly.

use axum::Router;
use axum::http::HeaderValue;
use axum::routing::get;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

/// Builds the application router with all routes and layers.
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state);

    Router::new()
        .route("/api/health", get(handlers::health::health))
        .route(
            "/api/conversations",
            get(handlers::conversation::list_conversations)
                .post(handlers::conversation::open_conversation),
        )
        .route(
            "/api/conversations/{conversation_id}/messages",
            get(handlers::message::list_messages).post(handlers::message::send_message),
        )
        .route("/ws", get(handlers::ws::ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(state: &AppState) -> CorsLayer {
    let origins = &state.config.server.cors.allowed_origins;
    if origins.iter().any(|o| o == "*") {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let parsed: Vec<HeaderValue> = origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        CorsLayer::new()
            .allow_origin(AllowOrigin::list(parsed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}
