//! Message handlers.

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use uuid::Uuid;
use validator::Validate;

use chatline_core::error::AppError;
use chatline_core::types::pagination::PageRequest;
use chatline_entity::message::MessageView;
use chatline_realtime::lifecycle::manager::SendMessageInput;

use crate::dto::request::SendMessageRequest;
use crate::dto::response::MessagesResponse;
use crate::error::ApiError;
use crate::extractors::AuthUser;
use crate::state::AppState;

/// GET /api/conversations/{id}/messages — paginated history, ascending.
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state
        .messages
        .list_messages(conversation_id, user.user_id, &page)
        .await?;
    Ok(Json(MessagesResponse::new(messages, &page)))
}

/// POST /api/conversations/{id}/messages — HTTP send path.
///
/// Routed through the same lifecycle as the socket path, so the returned
/// message already carries `delivered` when the recipient is online and the
/// realtime broadcast has gone out.
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(conversation_id): Path<Uuid>,
    Json(body): Json<SendMessageRequest>,
) -> Result<(StatusCode, Json<MessageView>), ApiError> {
    body.validate()
        .map_err(|e| AppError::validation(e.to_string()))?;

    let view = state
        .realtime
        .lifecycle
        .send_message(
            user.user_id,
            SendMessageInput {
                conversation_id,
                kind: body.kind,
                content: body.content,
                media_url: body.media_url,
                correlation_id: body.correlation_id.unwrap_or_else(Uuid::new_v4),
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(view)))
}
