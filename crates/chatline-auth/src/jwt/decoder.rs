//! JWT token validation.

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};

use chatline_core::config::auth::AuthConfig;
use chatline_core::error::AppError;

use super::claims::Claims;

/// Validates JWT access tokens.
#[derive(Clone)]
pub struct JwtDecoder {
    /// HMAC secret key for verification.
    decoding_key: DecodingKey,
    /// Validation configuration.
    validation: Validation,
}

impl std::fmt::Debug for JwtDecoder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtDecoder")
            .field("validation", &self.validation)
            .finish()
    }
}

impl JwtDecoder {
    /// Creates a new decoder from auth configuration.
    pub fn new(config: &AuthConfig) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.leeway = 5; // 5 seconds leeway for clock skew

        Self {
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            validation,
        }
    }

    /// Decodes and validates an access token string.
    pub fn decode_access_token(&self, token: &str) -> Result<Claims, AppError> {
        let token_data =
            decode::<Claims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::authentication("Token has expired")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidToken => {
                        AppError::authentication("Invalid token format")
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::authentication("Invalid token signature")
                    }
                    _ => AppError::authentication(format!("Token validation failed: {e}")),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jwt::encoder::JwtEncoder;
    use chatline_core::error::ErrorKind;
    use uuid::Uuid;

    fn config() -> AuthConfig {
        AuthConfig {
            jwt_secret: "test-secret".to_string(),
            access_token_ttl_seconds: 60,
        }
    }

    #[test]
    fn issued_tokens_decode_back_to_claims() {
        let encoder = JwtEncoder::new(&config());
        let decoder = JwtDecoder::new(&config());
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();

        let token = encoder.issue(user_id, session_id, "alice").unwrap();
        let claims = decoder.decode_access_token(&token).unwrap();

        assert_eq!(claims.user_id(), user_id);
        assert_eq!(claims.session_id(), session_id);
        assert_eq!(claims.username, "alice");
        assert!(!claims.is_expired());
    }

    #[test]
    fn garbage_tokens_are_rejected_as_authentication_failures() {
        let decoder = JwtDecoder::new(&config());
        let err = decoder.decode_access_token("not-a-token").unwrap_err();
        assert_eq!(err.kind, ErrorKind::Authentication);
    }

    #[test]
    fn wrong_secret_is_rejected() {
        let encoder = JwtEncoder::new(&config());
        let other = AuthConfig {
            jwt_secret: "different-secret".to_string(),
            access_token_ttl_seconds: 60,
        };
        let decoder = JwtDecoder::new(&other);
        let token = encoder.issue(Uuid::new_v4(), Uuid::new_v4(), "alice").unwrap();
        assert!(decoder.decode_access_token(&token).is_err());
    }
}
