//! JWT token creation.

use chrono::Utc;
use jsonwebtoken::{Algorithm, EncodingKey, Header, encode};
use uuid::Uuid;

use chatline_core::config::auth::AuthConfig;
use chatline_core::error::AppError;

use super::claims::Claims;

/// Signs access tokens for connections.
#[derive(Clone)]
pub struct JwtEncoder {
    encoding_key: EncodingKey,
    ttl_seconds: u64,
}

impl std::fmt::Debug for JwtEncoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtEncoder").finish()
    }
}

impl JwtEncoder {
    /// Creates a new encoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            ttl_seconds: config.access_token_ttl_seconds,
        }
    }

    /// Issues an access token for the given user and session.
    pub fn issue(
        &self,
        user_id: Uuid,
        session_id: Uuid,
        username: &str,
    ) -> Result<String, AppError> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            sub: user_id,
            sid: session_id,
            username: username.to_string(),
            iat: now,
            exp: now + self.ttl_seconds as i64,
            jti: Uuid::new_v4(),
        };

        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::internal(format!("Failed to sign token: {e}")))
    }
}
