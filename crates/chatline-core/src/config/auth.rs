//! Authentication configuration.

use serde::{Deserialize, Serialize};

/// JWT authentication configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing and verifying tokens.
    #[serde(default = "default_secret")]
    pub jwt_secret: String,
    /// Access token lifetime in seconds.
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_seconds: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: default_secret(),
            access_token_ttl_seconds: default_access_ttl(),
        }
    }
}

fn default_secret() -> String {
    // Development-only default; production deployments must override.
    "chatline-dev-secret-change-me".to_string()
}

fn default_access_ttl() -> u64 {
    3600
}
