use crate::domain::{models::message::MessageLog, ports::MessageLogRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::PgPool;

pub struct PostgresMessageLogRepo {
    pool: PgPool,
}

impl PostgresMessageLogRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl MessageLogRepository for PostgresMessageLogRepo {
    async fn log_message(&self, log: &MessageLog) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO message_logs (id, job_id, booking_id, recipient, kind, context_hash, sent_at, status)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        )
            .bind(&log.id).bind(&log.job_id).bind(&log.booking_id).bind(&log.recipient)
            .bind(&log.kind).bind(&log.context_hash).bind(log.sent_at).bind(&log.status)
            .execute(&self.pool).await.map_err(AppError::Database)?;
        Ok(())
    }

    async fn has_message_been_sent(&self, recipient: &str, kind: &str, context_hash: &str) -> Result<bool, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM message_logs WHERE recipient = $1 AND kind = $2 AND context_hash = $3 AND status = 'SENT'"
        )
            .bind(recipient).bind(kind).bind(context_hash)
            .fetch_one(&self.pool).await.map_err(AppError::Database)?;

        Ok(count > 0)
    }

    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<MessageLog>, AppError> {
        sqlx::query_as::<_, MessageLog>("SELECT * FROM message_logs WHERE booking_id = $1 ORDER BY sent_at ASC")
            .bind(booking_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }
}
