//! WebSocket upgrade handler.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Query, State, WebSocketUpgrade};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use tracing::{info, warn};

use chatline_auth::Claims;

use crate::error::ApiError;
use crate::state::AppState;

/// Query parameters for WebSocket authentication.
#[derive(Debug, serde::Deserialize)]
pub struct WsQuery {
    /// JWT access token.
    pub token: String,
}

/// GET /ws?token={jwt} — WebSocket upgrade.
///
/// The credential is checked before the upgrade; a bad token refuses the
/// connection before any registry entry exists.
pub async fn ws_handler(
    State(state): State<AppState>,
    ws: WebSocketUpgrade,
    Query(query): Query<WsQuery>,
) -> Result<Response, ApiError> {
    let claims = state.jwt_decoder.decode_access_token(&query.token)?;
    Ok(ws.on_upgrade(move |socket| handle_ws_connection(state, claims, socket)))
}

/// Handles an established WebSocket connection.
async fn handle_ws_connection(state: AppState, claims: Claims, socket: WebSocket) {
    let (mut ws_tx, mut ws_rx) = socket.split();

    let (handle, mut outbound_rx) = state
        .realtime
        .connect(claims.user_id(), claims.session_id(), claims.username.clone())
        .await;
    let conn_id = handle.id;

    info!(
        conn_id = %conn_id,
        user_id = %claims.user_id(),
        "WebSocket connection established"
    );

    // Forward engine events to the socket.
    let outbound_task = tokio::spawn(async move {
        while let Some(event) = outbound_rx.recv().await {
            let Ok(json) = serde_json::to_string(&event) else {
                continue;
            };
            if ws_tx.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    // Process inbound frames.
    while let Some(result) = ws_rx.next().await {
        match result {
            Ok(Message::Text(text)) => {
                state.realtime.handle_event(conn_id, &text).await;
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // Disconnect is the cancellation signal: the connection leaves every
    // room and the presence registry before this task ends.
    outbound_task.abort();
    state.realtime.disconnect(&conn_id).await;

    info!(
        conn_id = %conn_id,
        user_id = %claims.user_id(),
        "WebSocket connection closed"
    );
}
