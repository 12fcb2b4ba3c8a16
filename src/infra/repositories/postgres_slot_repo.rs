use crate::domain::{models::slot::WorkshopSlot, ports::SlotRepository};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{NaiveDate, NaiveTime};
use sqlx::PgPool;

pub struct PostgresSlotRepo {
    pool: PgPool,
}

impl PostgresSlotRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl SlotRepository for PostgresSlotRepo {
    async fn get_or_create(&self, slot: &WorkshopSlot) -> Result<WorkshopSlot, AppError> {
        sqlx::query(
            "INSERT INTO workshop_slots (id, workshop_template_id, date, start_time, end_time, capacity, status, seats_taken, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
             ON CONFLICT (workshop_template_id, date, start_time) DO NOTHING"
        )
            .bind(&slot.id).bind(&slot.workshop_template_id).bind(slot.date).bind(slot.start_time)
            .bind(slot.end_time).bind(slot.capacity).bind(slot.status.as_str()).bind(slot.seats_taken)
            .bind(slot.created_at)
            .execute(&self.pool).await.map_err(AppError::Database)?;

        self.find_by_identity(&slot.workshop_template_id, slot.date, slot.start_time).await?
            .ok_or(AppError::InternalWithMsg(format!("Slot {} vanished after insert", slot.id)))
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<WorkshopSlot>, AppError> {
        sqlx::query_as::<_, WorkshopSlot>("SELECT * FROM workshop_slots WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_identity(&self, template_id: &str, date: NaiveDate, start_time: NaiveTime) -> Result<Option<WorkshopSlot>, AppError> {
        sqlx::query_as::<_, WorkshopSlot>(
            "SELECT * FROM workshop_slots WHERE workshop_template_id = $1 AND date = $2 AND start_time = $3"
        )
            .bind(template_id).bind(date).bind(start_time)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WorkshopSlot>, AppError> {
        sqlx::query_as::<_, WorkshopSlot>(
            "SELECT * FROM workshop_slots WHERE date >= $1 AND date < $2 ORDER BY date ASC, start_time ASC"
        )
            .bind(start).bind(end)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_template(&self, template_id: &str) -> Result<Vec<WorkshopSlot>, AppError> {
        sqlx::query_as::<_, WorkshopSlot>(
            "SELECT * FROM workshop_slots WHERE workshop_template_id = $1 ORDER BY date ASC, start_time ASC"
        )
            .bind(template_id)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, slot: &WorkshopSlot) -> Result<Option<WorkshopSlot>, AppError> {
        sqlx::query_as::<_, WorkshopSlot>(
            "UPDATE workshop_slots SET capacity = $1, status = $2
             WHERE id = $3 AND seats_taken <= $1 AND ($2 = 'active' OR seats_taken = 0)
             RETURNING *"
        )
            .bind(slot.capacity).bind(slot.status.as_str()).bind(&slot.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }
}
