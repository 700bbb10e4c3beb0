//! Conversation handlers.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use chatline_entity::conversation::Conversation;
use chatline_service::ConversationSummary;

use crate::dto::request::OpenConversationRequest;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// POST /api/conversations — find-or-create a conversation with another
/// user. Idempotent; returns 201 either way, matching the original API.
pub async fn open_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    Json(body): Json<OpenConversationRequest>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    let conversation = state
        .conversations
        .open_conversation(user.user_id, body.participant_id)
        .await?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

/// GET /api/conversations — sidebar listing, most recently active first.
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<Vec<ConversationSummary>>, ApiError> {
    let summaries = state.conversations.list_conversations(user.user_id).await?;
    Ok(Json(summaries))
}
