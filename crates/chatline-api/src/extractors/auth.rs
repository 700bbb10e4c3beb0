//! Bearer-token authentication extractor.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use uuid::Uuid;

use chatline_core::error::AppError;

use crate::error::ApiError;
use crate::state::AppState;

/// The authenticated caller, extracted from the `Authorization: Bearer`
/// header. A missing or invalid credential rejects the request before any
/// handler runs.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// User ID from the token subject.
    pub user_id: Uuid,
    /// Session ID from the token.
    pub session_id: Uuid,
    /// Username from the token.
    pub username: String,
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .ok_or_else(|| ApiError(AppError::authentication("Missing Authorization header")))?;

        let token = header
            .strip_prefix("Bearer ")
            .ok_or_else(|| ApiError(AppError::authentication("Expected Bearer token")))?;

        let claims = state.jwt_decoder.decode_access_token(token)?;

        Ok(Self {
            user_id: claims.user_id(),
            session_id: claims.session_id(),
            username: claims.username,
        })
    }
}
