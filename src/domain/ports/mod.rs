use crate::domain::models::{
    template::WorkshopTemplate, slot::WorkshopSlot, booking::{Booking, StatusChange},
    job::Job, message::MessageLog, lead::{Lead, LeadMatch, LeadStatus, NewLead, LeadUpdate},
};
use crate::error::AppError;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

#[async_trait]
pub trait TemplateRepository: Send + Sync {
    async fn create(&self, template: &WorkshopTemplate) -> Result<WorkshopTemplate, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<WorkshopTemplate>, AppError>;
    async fn find_by_slug(&self, slug: &str) -> Result<Option<WorkshopTemplate>, AppError>;
    async fn list(&self) -> Result<Vec<WorkshopTemplate>, AppError>;
    async fn list_active(&self) -> Result<Vec<WorkshopTemplate>, AppError>;
    async fn update(&self, template: &WorkshopTemplate) -> Result<WorkshopTemplate, AppError>;
    /// Removes the template and its slots. Fails with `Conflict` if any booking
    /// references one of those slots.
    async fn delete(&self, id: &str) -> Result<(), AppError>;
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SlotOccupancy {
    pub workshop_slot_id: String,
    pub booked: i64,
}

#[async_trait]
pub trait SlotRepository: Send + Sync {
    /// Inserts the slot unless one already exists for the same
    /// (template, date, start_time), and returns whichever is stored.
    async fn get_or_create(&self, slot: &WorkshopSlot) -> Result<WorkshopSlot, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<WorkshopSlot>, AppError>;
    async fn find_by_identity(&self, template_id: &str, date: NaiveDate, start_time: NaiveTime) -> Result<Option<WorkshopSlot>, AppError>;
    /// Slots of any template with `start <= date < end`.
    async fn list_by_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<WorkshopSlot>, AppError>;
    async fn list_by_template(&self, template_id: &str) -> Result<Vec<WorkshopSlot>, AppError>;
    /// Staff edit of capacity and status. `seats_taken` is never written here.
    /// The write only lands while occupancy still fits the new capacity and, for
    /// a cancel, while no seat is taken; otherwise `None`.
    async fn update(&self, slot: &WorkshopSlot) -> Result<Option<WorkshopSlot>, AppError>;
}

#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Atomically claims a seat (conditional increment on the slot) and inserts
    /// the booking and its jobs. `CapacityExceeded` if the slot is full.
    async fn create_admitted(&self, booking: &Booking, jobs: Vec<Job>) -> Result<Booking, AppError>;
    async fn find_by_id(&self, id: &str) -> Result<Option<Booking>, AppError>;
    async fn list_by_slot(&self, slot_id: &str) -> Result<Vec<Booking>, AppError>;
    async fn list_by_phone_digits(&self, digits: &str) -> Result<Vec<Booking>, AppError>;
    async fn count_active(&self, slot_id: &str) -> Result<i64, AppError>;
    /// Occupancy of every slot dated `start <= date < end`.
    async fn occupancy_by_range(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<SlotOccupancy>, AppError>;
    /// Compare-and-set on status. Returns `None` when the stored status is no
    /// longer `change.from`. A move to `cancelled` also releases the seat and
    /// cancels the booking's pending jobs.
    async fn apply_status_change(&self, change: &StatusChange, jobs: Vec<Job>) -> Result<Option<Booking>, AppError>;
}

#[async_trait]
pub trait JobRepository: Send + Sync {
    async fn create(&self, job: &Job) -> Result<Job, AppError>;
    /// Claims up to `limit` due jobs, moving them to PROCESSING.
    async fn find_pending(&self, limit: i32) -> Result<Vec<Job>, AppError>;
    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<Job>, AppError>;
    async fn update_status(&self, id: &str, status: &str, error_message: Option<String>) -> Result<(), AppError>;
    /// Puts a failed job back in the queue with its attempt counter advanced.
    async fn reschedule(&self, id: &str, execute_at: DateTime<Utc>, attempts: i32, error_message: String) -> Result<(), AppError>;
}

#[async_trait]
pub trait MessageLogRepository: Send + Sync {
    async fn log_message(&self, log: &MessageLog) -> Result<(), AppError>;
    async fn has_message_been_sent(&self, recipient: &str, kind: &str, context_hash: &str) -> Result<bool, AppError>;
    async fn list_for_booking(&self, booking_id: &str) -> Result<Vec<MessageLog>, AppError>;
}

/// Outbound contact channel. Delivery is not confirmed synchronously; an `Ok`
/// only means the attempt was handed off.
#[async_trait]
pub trait MessageChannel: Send + Sync {
    async fn send_message(&self, phone: &str, text: &str) -> Result<(), AppError>;
}

/// External CRM lead store.
#[async_trait]
pub trait LeadStore: Send + Sync {
    /// `phone` is a normalized digit string; only exact digit matches count.
    async fn find_lead_by_phone(&self, phone: &str) -> Result<LeadMatch, AppError>;
    async fn list_leads_by_status(&self, statuses: &[LeadStatus]) -> Result<Vec<Lead>, AppError>;
    async fn create_lead(&self, lead: &NewLead) -> Result<Lead, AppError>;
    async fn update_lead(&self, id: &str, update: &LeadUpdate) -> Result<Lead, AppError>;
    /// No-op on the store side when the lead is already at or past `status`.
    async fn promote_lead_status(&self, id: &str, status: LeadStatus) -> Result<(), AppError>;
}
