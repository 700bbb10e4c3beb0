//! User repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use chatline_core::error::{AppError, ErrorKind};
use chatline_core::result::AppResult;
use chatline_entity::user::User;

use crate::store::UserStore;

/// Repository for user rows.
#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn find_user(&self, id: Uuid) -> AppResult<Option<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find user", e))
    }

    async fn find_users(&self, ids: &[Uuid]) -> AppResult<Vec<User>> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find users", e))
    }

    async fn set_presence(
        &self,
        id: Uuid,
        online: bool,
        last_seen_at: Option<DateTime<Utc>>,
    ) -> AppResult<()> {
        sqlx::query(
            "UPDATE users SET is_online = $2, last_seen_at = COALESCE($3, last_seen_at), \
             updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(online)
        .bind(last_seen_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to update presence", e))?;
        Ok(())
    }
}
