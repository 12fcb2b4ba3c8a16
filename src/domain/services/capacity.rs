use std::collections::HashMap;
use std::sync::Arc;
use chrono::NaiveDate;
use serde::Serialize;
use tracing::{info, warn};
use crate::domain::models::{booking::Booking, job::Job, slot::WorkshopSlot};
use crate::domain::ports::{BookingRepository, SlotRepository};
use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatAvailability {
    pub capacity: i32,
    pub booked: i64,
    pub remaining: i64,
}

impl SeatAvailability {
    pub fn new(capacity: i32, booked: i64) -> Self {
        Self { capacity, booked, remaining: (capacity as i64 - booked).max(0) }
    }
}

/// Occupancy reads and seat admission for slots.
///
/// Counts are advisory; `admit` re-checks atomically in the store.
pub struct CapacityLedger {
    bookings: Arc<dyn BookingRepository>,
    slots: Arc<dyn SlotRepository>,
}

impl CapacityLedger {
    pub fn new(bookings: Arc<dyn BookingRepository>, slots: Arc<dyn SlotRepository>) -> Self {
        Self { bookings, slots }
    }

    pub async fn occupancy(&self, slot_id: &str) -> Result<i64, AppError> {
        self.bookings.count_active(slot_id).await
    }

    pub async fn availability(&self, slot_id: &str) -> Result<SeatAvailability, AppError> {
        let slot = self.slots.find_by_id(slot_id).await?
            .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        let booked = self.occupancy(&slot.id).await?;
        Ok(SeatAvailability::new(slot.capacity, booked))
    }

    pub async fn occupancy_by_range(&self, start: NaiveDate, end: NaiveDate) -> Result<HashMap<String, i64>, AppError> {
        let rows = self.bookings.occupancy_by_range(start, end).await?;
        Ok(rows.into_iter().map(|r| (r.workshop_slot_id, r.booked)).collect())
    }

    /// Writes `booking` only if the slot still has a free seat at write time.
    pub async fn admit(&self, slot: &WorkshopSlot, booking: &Booking, jobs: Vec<Job>) -> Result<Booking, AppError> {
        match self.bookings.create_admitted(booking, jobs).await {
            Ok(created) => {
                info!("Seat admitted in slot {} for booking {}", slot.id, created.id);
                Ok(created)
            }
            Err(e @ AppError::CapacityExceeded { .. }) => {
                warn!("Slot {} ({} {}) rejected booking: full", slot.id, slot.date, slot.start_time);
                Err(e)
            }
            Err(e) => Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn availability_never_goes_negative() {
        let a = SeatAvailability::new(2, 3);
        assert_eq!(a.remaining, 0);

        let b = SeatAvailability::new(10, 9);
        assert_eq!(b.remaining, 1);
    }
}
