use std::sync::Arc;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use tracing::{info, warn};
use crate::domain::models::{
    booking::{AttendeeInfo, Booking, StatusChange},
    job::{Job, JOB_AUTO_REMINDER, JOB_FEEDBACK_MESSAGE, JOB_PIPELINE_PROMOTE, JOB_REMINDER_MESSAGE},
    lead::LeadFields,
    slot::{SlotStatus, VirtualSlot, WorkshopSlot},
    template::WorkshopTemplate,
};
use crate::domain::ports::{BookingRepository, SlotRepository, TemplateRepository};
use crate::domain::services::capacity::{CapacityLedger, SeatAvailability};
use crate::domain::services::lifecycle::{next_status, LifecycleEvent, Transition};
use crate::domain::services::materializer::{is_occurrence, merge_virtual_slots, DateWindow};
use crate::domain::services::pipeline::phone_key;
use crate::error::AppError;

const MAX_WINDOW_DAYS: u32 = 366;
const MAX_CAS_ATTEMPTS: usize = 3;

#[derive(Debug, Clone)]
pub enum TemplateRef {
    Id(String),
    Slug(String),
}

/// Identity of the occurrence a reservation targets.
#[derive(Debug, Clone)]
pub struct SlotQuery {
    pub template: TemplateRef,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
}

/// Staff edit of one occurrence.
#[derive(Debug, Clone, Default)]
pub struct SlotOverride {
    pub capacity: Option<i32>,
    pub cancelled: Option<bool>,
}

pub struct SchedulingService {
    templates: Arc<dyn TemplateRepository>,
    slots: Arc<dyn SlotRepository>,
    bookings: Arc<dyn BookingRepository>,
    ledger: CapacityLedger,
    timezone: Tz,
    reminder_lead: Duration,
}

impl SchedulingService {
    pub fn new(
        templates: Arc<dyn TemplateRepository>,
        slots: Arc<dyn SlotRepository>,
        bookings: Arc<dyn BookingRepository>,
        timezone: Tz,
        reminder_lead_hours: i64,
    ) -> Self {
        Self {
            ledger: CapacityLedger::new(bookings.clone(), slots.clone()),
            templates,
            slots,
            bookings,
            timezone,
            reminder_lead: Duration::hours(reminder_lead_hours),
        }
    }

    /// Wall-clock slot start in the academy timezone, as UTC.
    pub fn slot_start_utc(&self, date: NaiveDate, start_time: NaiveTime) -> DateTime<Utc> {
        let local = date.and_time(start_time);
        self.timezone
            .from_local_datetime(&local)
            .earliest()
            .map(|dt| dt.with_timezone(&Utc))
            .unwrap_or_else(|| Utc.from_utc_datetime(&local))
    }

    pub fn today(&self) -> NaiveDate {
        Utc::now().with_timezone(&self.timezone).date_naive()
    }

    pub async fn list_virtual_slots(&self, from: NaiveDate, days: u32, future_only: bool) -> Result<Vec<VirtualSlot>, AppError> {
        if days == 0 || days > MAX_WINDOW_DAYS {
            return Err(AppError::Validation(format!("days must be between 1 and {}", MAX_WINDOW_DAYS)));
        }
        let window = DateWindow::new(from, days);

        let templates = self.templates.list_active().await?;
        let persisted = self.slots.list_by_range(window.from, window.end()).await?;
        let occupancy = self.ledger.occupancy_by_range(window.from, window.end()).await?;

        let mut slots = merge_virtual_slots(&templates, &persisted, &occupancy, window);
        if future_only {
            let now = Utc::now();
            slots.retain(|s| self.slot_start_utc(s.date, s.start_time) > now);
        }
        Ok(slots)
    }

    async fn resolve_template(&self, template: &TemplateRef) -> Result<WorkshopTemplate, AppError> {
        let found = match template {
            TemplateRef::Id(id) => self.templates.find_by_id(id).await?,
            TemplateRef::Slug(slug) => self.templates.find_by_slug(slug).await?,
        };
        found.ok_or(AppError::NotFound("Workshop not found".into()))
    }

    /// Returns the persisted slot for an occurrence, creating it from template
    /// defaults the first time it is needed.
    async fn materialize(&self, template: &WorkshopTemplate, date: NaiveDate, start_time: NaiveTime) -> Result<WorkshopSlot, AppError> {
        if let Some(slot) = self.slots.find_by_identity(&template.id, date, start_time).await? {
            return Ok(slot);
        }
        if !is_occurrence(&template.recurrence, date, start_time) {
            return Err(AppError::NotFound(format!(
                "'{}' has no session on {} at {}",
                template.title, date, start_time.format("%H:%M")
            )));
        }
        let slot = self.slots.get_or_create(&WorkshopSlot::from_template(template, date, start_time)).await?;
        info!("Materialized slot {} for template {} on {} {}", slot.id, template.id, date, start_time);
        Ok(slot)
    }

    pub async fn reserve_seat(&self, query: SlotQuery, attendee: AttendeeInfo) -> Result<Booking, AppError> {
        validate_attendee(&attendee)?;

        let template = self.resolve_template(&query.template).await?;
        if !template.is_active {
            return Err(AppError::Conflict(format!("'{}' is not taking bookings", template.title)));
        }

        let starts_at = self.slot_start_utc(query.date, query.start_time);
        let now = Utc::now();
        if starts_at <= now {
            return Err(AppError::Validation("Cannot book a workshop that has already started".into()));
        }

        let slot = self.materialize(&template, query.date, query.start_time).await?;
        if slot.is_cancelled() {
            return Err(AppError::Conflict("This workshop session has been cancelled".into()));
        }

        let booking = Booking::new(slot.id.clone(), attendee);

        let mut jobs = vec![Job::new(JOB_PIPELINE_PROMOTE, booking.id.clone(), now)];
        let remind_at = starts_at - self.reminder_lead;
        if remind_at > now {
            jobs.push(Job::new(JOB_AUTO_REMINDER, booking.id.clone(), remind_at));
        }

        let created = self.ledger.admit(&slot, &booking, jobs).await?;
        info!("Booking {} confirmed for '{}' on {} {}", created.id, template.title, slot.date, slot.start_time);
        Ok(created)
    }

    pub async fn find_booking(&self, booking_id: &str) -> Result<Booking, AppError> {
        self.bookings.find_by_id(booking_id).await?
            .ok_or(AppError::NotFound(format!("Booking {} not found", booking_id)))
    }

    /// Applies one lifecycle event. Read, validate and write happen as a
    /// compare-and-set; a lost race is re-evaluated against the fresh status.
    pub async fn transition_booking(
        &self,
        booking_id: &str,
        event: LifecycleEvent,
        fields: Option<LeadFields>,
    ) -> Result<Booking, AppError> {
        for _ in 0..MAX_CAS_ATTEMPTS {
            let booking = self.find_booking(booking_id).await?;

            let to = match next_status(booking.status, event) {
                Ok(Transition::Unchanged) => {
                    info!("{} on booking {} already applied", event, booking.id);
                    return Ok(booking);
                }
                Ok(Transition::Move(to)) => to,
                Err(e) => {
                    warn!("Rejected {} on booking {} in status {}", event, booking.id, booking.status);
                    return Err(e);
                }
            };

            let jobs = side_effect_jobs(&booking, event, fields.clone());
            let change = StatusChange { booking_id: booking.id.clone(), from: booking.status, to };

            if let Some(updated) = self.bookings.apply_status_change(&change, jobs).await? {
                info!("Booking {}: {} -> {} ({})", updated.id, change.from, change.to, event);
                return Ok(updated);
            }
            warn!("Booking {} changed while applying {}; re-reading", booking.id, event);
        }
        Err(AppError::Conflict("Booking is being modified concurrently; refresh and retry".into()))
    }

    pub async fn list_bookings_for_slot(&self, slot_id: &str) -> Result<Vec<Booking>, AppError> {
        self.slots.find_by_id(slot_id).await?
            .ok_or(AppError::NotFound(format!("Slot {} not found", slot_id)))?;
        self.bookings.list_by_slot(slot_id).await
    }

    pub async fn list_bookings_for_phone(&self, phone: &str) -> Result<Vec<Booking>, AppError> {
        match phone_key(phone) {
            Some(digits) => self.bookings.list_by_phone_digits(&digits).await,
            None => Err(AppError::Validation("phone must contain at least 7 digits".into())),
        }
    }

    pub async fn availability(&self, slot_id: &str) -> Result<SeatAvailability, AppError> {
        self.ledger.availability(slot_id).await
    }

    pub async fn override_slot(
        &self,
        template_id: &str,
        date: NaiveDate,
        start_time: NaiveTime,
        edit: SlotOverride,
    ) -> Result<WorkshopSlot, AppError> {
        let template = self.resolve_template(&TemplateRef::Id(template_id.to_string())).await?;
        let mut slot = self.materialize(&template, date, start_time).await?;

        let booked = self.ledger.occupancy(&slot.id).await?;
        if let Some(capacity) = edit.capacity {
            if capacity < 1 {
                return Err(AppError::Validation("capacity must be at least 1".into()));
            }
            if (capacity as i64) < booked {
                return Err(AppError::Validation(format!(
                    "capacity {} is below the {} seats already booked", capacity, booked
                )));
            }
            slot.capacity = capacity;
        }
        if let Some(cancelled) = edit.cancelled {
            if cancelled && booked > 0 {
                return Err(AppError::Conflict(format!(
                    "Slot still has {} active bookings; cancel them first", booked
                )));
            }
            slot.status = if cancelled { SlotStatus::Cancelled } else { SlotStatus::Active };
        }

        let saved = self.slots.update(&slot).await?
            .ok_or(AppError::Conflict("Seats were booked while editing; reload the slot".into()))?;
        info!("Slot {} updated: capacity {}, status {}", saved.id, saved.capacity, saved.status);
        Ok(saved)
    }
}

fn side_effect_jobs(booking: &Booking, event: LifecycleEvent, fields: Option<LeadFields>) -> Vec<Job> {
    let now = Utc::now();
    match event {
        LifecycleEvent::SendReminder => vec![Job::new(JOB_REMINDER_MESSAGE, booking.id.clone(), now)],
        LifecycleEvent::RequestFeedback => vec![Job::new(JOB_FEEDBACK_MESSAGE, booking.id.clone(), now)],
        LifecycleEvent::Convert => vec![Job::lead_convert(booking.id.clone(), fields.unwrap_or_default())],
        LifecycleEvent::Reconfirm
        | LifecycleEvent::Cancel
        | LifecycleEvent::MarkAttended
        | LifecycleEvent::MarkNoShow => Vec::new(),
    }
}

fn validate_attendee(attendee: &AttendeeInfo) -> Result<(), AppError> {
    if attendee.attendee_name.trim().is_empty() {
        return Err(AppError::Validation("attendee_name must not be empty".into()));
    }
    if phone_key(&attendee.phone).is_none() {
        return Err(AppError::Validation("phone must contain at least 7 digits".into()));
    }
    if let Some(email) = &attendee.email
        && !email.is_empty()
        && !email.contains('@') {
        return Err(AppError::Validation("email is not valid".into()));
    }
    Ok(())
}
