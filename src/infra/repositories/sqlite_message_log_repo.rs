use crate::domain::{models::message::MessageLog, ports::MessageLogRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;

pub struct SqliteMessageLogRepo {
    pool: SqlitePool,
}

impl SqliteMessageLogRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl MessageLogRepository for SqliteMessageLogRepo {
    async fn log_message(&self, log: &MessageLog) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO message_logs (id, job_id, booking_id, recipient, kind, context_hash, sent_at, status)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
            .bind(&log.id).bind(&log.job_id).bind(&log.booking_id).bind(&log.recipient)
            .bind(&log.kind).bind(&log.context_hash).bind(log.sent_at).bind(&log.status)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn has_message_been_sent(&self, recipient: &str, kind: &str, context_hash: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_logs WHERE recipient = ? AND kind = ? AND context_hash = ? AND status = 'SENT'"
        )
            .bind(recipient).bind(kind).bind(context_hash)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;

        Ok(count > 0)
    }

    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<MessageLog>, AppError> {
        sqlx::query_as::<_, MessageLog>("SELECT * FROM message_logs WHERE booking_id = ? ORDER BY sent_at ASC")
            .bind(booking_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
