//! Chatline server — two-party direct messaging with a real-time delivery
//! and presence engine.
//!
//! Main entry point that wires all crates together and starts the server.

use std::sync::Arc;

use tracing_subscriber::{EnvFilter, fmt};

use chatline_core::config::AppConfig;
use chatline_core::error::AppError;
use chatline_database::memory::MemoryStore;
use chatline_database::repositories::{
    ConversationRepository, MessageRepository, UserRepository,
};
use chatline_database::store::{ConversationStore, MessageStore, UserStore};
use chatline_realtime::RealtimeEngine;
use chatline_service::{ConversationService, MessageService};

#[tokio::main]
async fn main() {
    let env = std::env::var("CHATLINE_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}

/// Initialize tracing/logging.
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
        _ => {
            fmt().pretty().with_env_filter(filter).with_target(true).init();
        }
    }
}

/// Main server run function.
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting Chatline v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Stores ───────────────────────────────────────────
    let (users, conversation_store, message_store) = build_stores(&config).await?;

    // ── Step 2: Services ─────────────────────────────────────────
    let conversations = Arc::new(ConversationService::new(
        conversation_store.clone(),
        message_store.clone(),
        users.clone(),
    ));
    let messages = Arc::new(MessageService::new(
        message_store,
        conversation_store,
        users.clone(),
        config.realtime.text_max_chars,
    ));
    tracing::info!("Services initialized");

    // ── Step 3: Real-time engine ─────────────────────────────────
    let realtime = Arc::new(RealtimeEngine::new(
        config.realtime.clone(),
        users,
        messages.clone(),
        conversations.clone(),
    ));

    // ── Step 4: Auth ─────────────────────────────────────────────
    let jwt_decoder = Arc::new(chatline_auth::JwtDecoder::new(&config.auth));

    // ── Step 5: HTTP server ──────────────────────────────────────
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = chatline_api::AppState {
        config: Arc::new(config),
        jwt_decoder,
        conversations,
        messages,
        realtime: realtime.clone(),
    };
    let app = chatline_api::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    tracing::info!("Chatline server listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    realtime.shutdown().await;

    tracing::info!("Chatline server shut down gracefully");
    Ok(())
}

/// Build the configured store provider.
async fn build_stores(
    config: &AppConfig,
) -> Result<
    (
        Arc<dyn UserStore>,
        Arc<dyn ConversationStore>,
        Arc<dyn MessageStore>,
    ),
    AppError,
> {
    match config.database.provider.as_str() {
        "memory" => {
            tracing::warn!("Using the in-memory store; nothing will be persisted");
            let store = Arc::new(MemoryStore::new());
            Ok((store.clone(), store.clone(), store))
        }
        _ => {
            tracing::info!("Connecting to database...");
            let pool = chatline_database::DatabasePool::connect(&config.database).await?;
            chatline_database::migration::run_migrations(pool.pool()).await?;

            let pg = pool.pool().clone();
            Ok((
                Arc::new(UserRepository::new(pg.clone())),
                Arc::new(ConversationRepository::new(pg.clone())),
                Arc::new(MessageRepository::new(pg)),
            ))
        }
    }
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
