use crate::domain::{
    models::{booking::{Booking, BookingStatus, StatusChange}, job::Job, slot::WorkshopSlot},
    ports::{BookingRepository, SlotOccupancy},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;

pub struct SqliteBookingRepo {
    pool: SqlitePool,
}

impl SqliteBookingRepo {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BookingRepository for SqliteBookingRepo {
    async fn create_admitted(&self, booking: &Booking, jobs: Vec<Job>) -> Result<Booking, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        // First statement is the write so the transaction takes the write lock up front.
        let claimed = sqlx::query(
            "UPDATE workshop_slots SET seats_taken = seats_taken + 1
             WHERE id = ? AND status = 'active' AND seats_taken < capacity"
        )
            .bind(&booking.workshop_slot_id)
            .execute(&mut *tx).await.map_err(AppError::Database)?;

        if claimed.rows_affected() == 0 {
            let slot = sqlx::query_as::<_, WorkshopSlot>("SELECT * FROM workshop_slots WHERE id = ?")
                .bind(&booking.workshop_slot_id)
                .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;
            return Err(match slot {
                None => AppError::NotFound(format!("Slot {} not found", booking.workshop_slot_id)),
                Some(s) if s.is_cancelled() => AppError::Conflict("This workshop session has been cancelled".into()),
                Some(s) => AppError::CapacityExceeded { slot_id: s.id, capacity: s.capacity },
            });
        }

        let created = sqlx::query_as::<_, Booking>(
            "INSERT INTO bookings (id, workshop_slot_id, attendee_name, guardian_name, phone, phone_digits, email, status, notes, payment_status, booked_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             RETURNING *"
        )
            .bind(&booking.id).bind(&booking.workshop_slot_id).bind(&booking.attendee_name).bind(&booking.guardian_name)
            .bind(&booking.phone).bind(&booking.phone_digits).bind(&booking.email).bind(booking.status.as_str())
            .bind(&booking.notes).bind(&booking.payment_status).bind(booking.booked_at).bind(booking.updated_at)
            .fetch_one(&mut *tx).await.map_err(AppError::Database)?;

        for job in jobs {
            sqlx::query("INSERT INTO jobs (id, job_type, payload, execute_at, status, attempts, error_message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
                .bind(&job.id).bind(&job.job_type).bind(&job.payload).bind(job.execute_at).bind(&job.status)
                .bind(job.attempts).bind(&job.error_message).bind(job.created_at)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(created)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE id = ?").bind(id).fetch_optional(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_slot(&self, slot_id: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE workshop_slot_id = ? ORDER BY booked_at ASC").bind(slot_id).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn list_by_phone_digits(&self, digits: &str) -> Result<Vec<Booking>, AppError> {
        sqlx::query_as::<_, Booking>("SELECT * FROM bookings WHERE phone_digits = ? ORDER BY booked_at DESC").bind(digits).fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn count_active(&self, slot_id: &str) -> Result<i64, AppError> {
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM bookings WHERE workshop_slot_id = ? AND status != 'cancelled'")
            .bind(slot_id)
            .fetch_one(&self.pool).await.map_err(AppError::Database)
    }

    async fn occupancy_by_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<SlotOccupancy>, AppError> {
        sqlx::query_as::<_, SlotOccupancy>(
            "SELECT b.workshop_slot_id, COUNT(*) AS booked
             FROM bookings b JOIN workshop_slots s ON s.id = b.workshop_slot_id
             WHERE s.date >= ? AND s.date < ? AND b.status != 'cancelled'
             GROUP BY b.workshop_slot_id"
        )
            .bind(start).bind(end)
            .fetch_all(&self.pool).await.map_err(AppError::Database)
    }

    async fn apply_status_change(&self, change: &StatusChange, jobs: Vec<Job>) -> Result<Option<Booking>, AppError> {
        let mut tx = self.pool.begin().await.map_err(AppError::Database)?;

        let updated = sqlx::query_as::<_, Booking>(
            "UPDATE bookings SET status = ?, updated_at = ? WHERE id = ? AND status = ? RETURNING *"
        )
            .bind(change.to.as_str()).bind(Utc::now()).bind(&change.booking_id).bind(change.from.as_str())
            .fetch_optional(&mut *tx).await.map_err(AppError::Database)?;

        let Some(updated) = updated else {
            return Ok(None);
        };

        if change.from.occupies_seat() && change.to == BookingStatus::Cancelled {
            sqlx::query("UPDATE workshop_slots SET seats_taken = seats_taken - 1 WHERE id = ? AND seats_taken > 0")
                .bind(&updated.workshop_slot_id)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
            sqlx::query("UPDATE jobs SET status = 'CANCELLED' WHERE json_extract(payload, '$.booking_id') = ? AND status = 'PENDING'")
                .bind(&updated.id)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }

        for job in jobs {
            sqlx::query("INSERT INTO jobs (id, job_type, payload, execute_at, status, attempts, error_message, created_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?)")
                .bind(&job.id).bind(&job.job_type).bind(&job.payload).bind(job.execute_at).bind(&job.status)
                .bind(job.attempts).bind(&job.error_message).bind(job.created_at)
                .execute(&mut *tx).await.map_err(AppError::Database)?;
        }

        tx.commit().await.map_err(AppError::Database)?;
        Ok(Some(updated))
    }
}
