//! Conversation repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use chatline_core::error::{AppError, ErrorKind};
use chatline_core::result::AppResult;
use chatline_entity::conversation::{Conversation, ParticipantPair};

use crate::store::ConversationStore;

/// Repository for conversation rows.
#[derive(Debug, Clone)]
pub struct ConversationRepository {
    pool: PgPool,
}

impl ConversationRepository {
    /// Create a new conversation repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConversationStore for ConversationRepository {
    async fn find_or_create(&self, pair: ParticipantPair) -> AppResult<Conversation> {
        // The pair is normalized (a < b) and unique, so a conflict-ignoring
        // insert followed by a select is race-free find-or-create.
        sqlx::query(
            "INSERT INTO conversations (participant_a, participant_b) VALUES ($1, $2) \
             ON CONFLICT (participant_a, participant_b) DO NOTHING",
        )
        .bind(pair.a)
        .bind(pair.b)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to create conversation", e)
        })?;

        sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE participant_a = $1 AND participant_b = $2",
        )
        .bind(pair.a)
        .bind(pair.b)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load conversation", e))
    }

    async fn find_conversation(&self, id: Uuid) -> AppResult<Option<Conversation>> {
        sqlx::query_as::<_, Conversation>("SELECT * FROM conversations WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to find conversation", e)
            })
    }

    async fn conversations_for(&self, user_id: Uuid) -> AppResult<Vec<Conversation>> {
        sqlx::query_as::<_, Conversation>(
            "SELECT * FROM conversations WHERE participant_a = $1 OR participant_b = $1 \
             ORDER BY last_activity_at DESC",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list conversations", e))
    }

    async fn touch(&self, id: Uuid, last_message_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        sqlx::query(
            "UPDATE conversations SET last_message_id = $2, last_activity_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(last_message_id)
        .bind(at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to touch conversation", e)
        })?;
        Ok(())
    }
}
