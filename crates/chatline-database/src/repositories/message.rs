//! Message repository implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use chatline_core::error::{AppError, ErrorKind};
use chatline_core::result::AppResult;
use chatline_core::types::pagination::PageRequest;
use chatline_entity::message::{Message, MessageReceipt, NewMessage};

use crate::store::MessageStore;

/// Repository for message rows and read receipts.
#[derive(Debug, Clone)]
pub struct MessageRepository {
    pool: PgPool,
}

impl MessageRepository {
    /// Create a new message repository.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MessageStore for MessageRepository {
    async fn insert(&self, new: &NewMessage) -> AppResult<Message> {
        sqlx::query_as::<_, Message>(
            "INSERT INTO messages (conversation_id, sender_id, kind, content, media_url) \
             VALUES ($1, $2, $3, $4, $5) RETURNING *",
        )
        .bind(new.conversation_id)
        .bind(new.sender_id)
        .bind(new.kind)
        .bind(&new.content)
        .bind(&new.media_url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to insert message", e))
    }

    async fn find_message(&self, id: Uuid) -> AppResult<Option<Message>> {
        sqlx::query_as::<_, Message>("SELECT * FROM messages WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to find message", e))
    }

    async fn page_for_conversation(
        &self,
        conversation_id: Uuid,
        page: &PageRequest,
    ) -> AppResult<Vec<Message>> {
        let mut messages = sqlx::query_as::<_, Message>(
            "SELECT * FROM messages WHERE conversation_id = $1 \
             ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(conversation_id)
        .bind(page.limit() as i64)
        .bind(page.offset() as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to list messages", e))?;

        // Fetched newest-first for paging; callers want ascending order.
        messages.reverse();
        Ok(messages)
    }

    async fn mark_delivered(&self, message_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE messages SET status = 'delivered', updated_at = NOW() \
             WHERE id = $1 AND status = 'sent'",
        )
        .bind(message_id)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark delivered", e))?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_read(
        &self,
        conversation_id: Uuid,
        author_id: Uuid,
        reader_id: Uuid,
        at: DateTime<Utc>,
    ) -> AppResult<u64> {
        // Status advance and receipt insert commit together so that
        // `status == read` iff a receipt exists.
        let mut tx = self.pool.begin().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to begin transaction", e)
        })?;

        let ids: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE messages SET status = 'read', updated_at = $3 \
             WHERE conversation_id = $1 AND sender_id = $2 AND status <> 'read' \
             RETURNING id",
        )
        .bind(conversation_id)
        .bind(author_id)
        .bind(at)
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to mark read", e))?;

        if !ids.is_empty() {
            sqlx::query(
                "INSERT INTO message_reads (message_id, reader_id, read_at) \
                 SELECT unnest($1::uuid[]), $2, $3 \
                 ON CONFLICT (message_id, reader_id) DO NOTHING",
            )
            .bind(&ids)
            .bind(reader_id)
            .bind(at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                AppError::with_source(ErrorKind::Database, "Failed to record receipts", e)
            })?;
        }

        tx.commit().await.map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to commit read marking", e)
        })?;

        Ok(ids.len() as u64)
    }

    async fn promote_pending(&self, recipient_id: Uuid) -> AppResult<Vec<Uuid>> {
        let senders: Vec<Uuid> = sqlx::query_scalar(
            "UPDATE messages m SET status = 'delivered', updated_at = NOW() \
             FROM conversations c \
             WHERE m.conversation_id = c.id \
               AND (c.participant_a = $1 OR c.participant_b = $1) \
               AND m.sender_id <> $1 \
               AND m.status = 'sent' \
             RETURNING m.sender_id",
        )
        .bind(recipient_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            AppError::with_source(ErrorKind::Database, "Failed to promote pending messages", e)
        })?;

        let mut distinct = senders;
        distinct.sort_unstable();
        distinct.dedup();
        Ok(distinct)
    }

    async fn count_unread(&self, conversation_id: Uuid, author_id: Uuid) -> AppResult<i64> {
        sqlx::query_scalar(
            "SELECT COUNT(*) FROM messages \
             WHERE conversation_id = $1 AND sender_id = $2 AND status <> 'read'",
        )
        .bind(conversation_id)
        .bind(author_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to count unread", e))
    }

    async fn receipts_for(&self, message_id: Uuid) -> AppResult<Vec<MessageReceipt>> {
        sqlx::query_as::<_, MessageReceipt>(
            "SELECT * FROM message_reads WHERE message_id = $1 ORDER BY read_at",
        )
        .bind(message_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::with_source(ErrorKind::Database, "Failed to load receipts", e))
    }
}
