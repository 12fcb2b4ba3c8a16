use crate::domain::{models::template::WorkshopTemplate, ports::TemplateRepository};
use crate::error::AppError;
use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

pub struct PostgresTemplateRepo {
    pool: PgPool,
}

impl PostgresTemplateRepo {
    pub fn new(pool: PgPool) -> Self { Self { pool } }
}

#[async_trait]
impl TemplateRepository for PostgresTemplateRepo {
    async fn create(&self, t: &WorkshopTemplate) -> Result<WorkshopTemplate, AppError> {
        sqlx::query_as::<_, WorkshopTemplate>(
            "INSERT INTO workshop_templates (id, slug, title, description, duration_min, recurrence, capacity_per_slot, is_active, target_audience, created_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING *"
        )
            .bind(&t.id).bind(&t.slug).bind(&t.title).bind(&t.description).bind(t.duration_min)
            .bind(Json(&t.recurrence)).bind(t.capacity_per_slot).bind(t.is_active)
            .bind(&t.target_audience).bind(t.created_at)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<WorkshopTemplate>, AppError> {
        sqlx::query_as::<_, WorkshopTemplate>("SELECT * FROM workshop_templates WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Option<WorkshopTemplate>, AppError> {
        sqlx::query_as::<_, WorkshopTemplate>("SELECT * FROM workshop_templates WHERE slug = $1")
            .bind(slug)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list(&self) -> Result<Vec<WorkshopTemplate>, AppError> {
        sqlx::query_as::<_, WorkshopTemplate>("SELECT * FROM workshop_templates ORDER BY title ASC")
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_active(&self) -> Result<Vec<WorkshopTemplate>, AppError> {
        sqlx::query_as::<_, WorkshopTemplate>("SELECT * FROM workshop_templates WHERE is_active = TRUE ORDER BY title ASC")
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn update(&self, t: &WorkshopTemplate) -> Result<WorkshopTemplate, AppError> {
        sqlx::query_as::<_, WorkshopTemplate>(
            "UPDATE workshop_templates SET title=$1, description=$2, duration_min=$3, recurrence=$4, capacity_per_slot=$5, is_active=$6, target_audience=$7
             WHERE id=$8 RETURNING *"
        )
            .bind(&t.title).bind(&t.description).bind(t.duration_min).bind(Json(&t.recurrence))
            .bind(t.capacity_per_slot).bind(t.is_active).bind(&t.target_audience).bind(&t.id)
            .fetch_optional(&self.pool).await.map_err(AppError::Database)?
            .ok_or(AppError::NotFound("Workshop not found".into()))
    }

    async fn delete(&self, id: &str) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let booked: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM bookings b JOIN workshop_slots s ON b.workshop_slot_id = s.id WHERE s.workshop_template_id = $1"
        )
            .bind(id)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;
        if booked > 0 {
            return Err(AppError::Conflict(format!("Workshop has {} bookings; deactivate it instead", booked)));
        }

        sqlx::query("DELETE FROM workshop_slots WHERE workshop_template_id = $1")
            .bind(id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        let res = sqlx::query("DELETE FROM workshop_templates WHERE id = $1")
            .bind(id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;
        if res.rows_affected() == 0 {
            return Err(AppError::NotFound("Workshop not found".into()));
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(())
    }
}
