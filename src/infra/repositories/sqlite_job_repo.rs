use crate::domain::{models::job::{Job, CLAIM_LEASE_MINUTES}, ports::JobRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::SqlitePool;
use chrono::{DateTime, Duration, Utc};

pub struct SqliteJobRepo {
    pool: SqlitePool,
}

impl SqliteJobRepo {
    pub fn new(pool: SqlitePool) -> Self { Self { pool } }
}

#[async_trait]
impl JobRepository for SqliteJobRepo {
    async fn create(&self, job: &Job) -> Result<Job, AppError> {
        sqlx::query_as::<_, Job>(
            "INSERT INTO jobs (id, job_type, payload, execute_at, status, attempts, error_message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?) RETURNING *"
        )
            .bind(&job.id)
            .bind(&job.job_type)
            .bind(&job.payload)
            .bind(job.execute_at)
            .bind(&job.status)
            .bind(job.attempts)
            .bind(&job.error_message)
            .bind(job.created_at)
            .fetch_one(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    /// Claims due jobs plus PROCESSING jobs whose lease ran out. A reclaim
    /// counts as a spent attempt.
    async fn find_pending(&self, limit: i32) -> Result<Vec<Job>, AppError> {
        let now = Utc::now();
        let stale = now - Duration::minutes(CLAIM_LEASE_MINUTES);
        sqlx::query_as::<_, Job>(
            r#"
            UPDATE jobs
            SET status = 'PROCESSING',
                claimed_at = ?,
                attempts = attempts + CASE WHEN status = 'PROCESSING' THEN 1 ELSE 0 END
            WHERE id IN (
                SELECT id FROM jobs
                WHERE (status = 'PENDING' AND execute_at <= ?)
                   OR (status = 'PROCESSING' AND claimed_at <= ?)
                ORDER BY execute_at ASC
                LIMIT ?
            )
            RETURNING *
            "#
        )
            .bind(now)
            .bind(now)
            .bind(stale)
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<Job>, AppError> {
        sqlx::query_as::<_, Job>(
            "SELECT * FROM jobs WHERE json_extract(payload, '$.booking_id') = ? ORDER BY created_at ASC"
        )
            .bind(booking_id)
            .fetch_all(&self.pool)
            .await
            .map_err(AppError::Database)
    }

    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET status = ?, error_message = ? WHERE id = ?")
            .bind(status)
            .bind(error_message)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }

    async fn reschedule(&self, id: &str, execute_at: DateTime<Utc>, attempts: i32, error_message: String) -> Result<(), AppError> {
        sqlx::query("UPDATE jobs SET status = 'PENDING', execute_at = ?, attempts = ?, error_message = ? WHERE id = ? AND status = 'PROCESSING'")
            .bind(execute_at)
            .bind(attempts)
            .bind(error_message)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(AppError::Database)?;
        Ok(())
    }
}
