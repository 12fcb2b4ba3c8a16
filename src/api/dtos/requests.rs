use crate::domain::models::{booking::AttendeeInfo, lead::LeadFields};
use crate::domain::services::lifecycle::LifecycleEvent;
use serde::Deserialize;

#[derive(Deserialize)]
pub struct RecurrenceRequest {
    #[serde(rename = "type")]
    pub recurrence_type: String,
    pub weekdays: Option<Vec<u8>>,
    pub date: Option<String>,
    pub time: String,
}

#[derive(Deserialize)]
pub struct CreateTemplateRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub duration_min: i32,
    pub recurrence: RecurrenceRequest,
    pub capacity_per_slot: i32,
    pub is_active: Option<bool>,
    #[serde(default)]
    pub target_audience: String,
}

#[derive(Deserialize)]
pub struct UpdateTemplateRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub duration_min: Option<i32>,
    pub recurrence: Option<RecurrenceRequest>,
    pub capacity_per_slot: Option<i32>,
    pub is_active: Option<bool>,
    pub target_audience: Option<String>,
}

#[derive(Deserialize)]
pub struct SlotOverrideRequest {
    pub date: String,
    pub time: String,
    pub capacity: Option<i32>,
    pub cancelled: Option<bool>,
}

#[derive(Deserialize)]
pub struct SlotsQuery {
    pub from: Option<String>,
    pub days: Option<u32>,
    #[serde(default)]
    pub future_only: bool,
}

#[derive(Deserialize)]
pub struct AttendeeRequest {
    pub attendee_name: String,
    #[serde(default)]
    pub guardian_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl From<AttendeeRequest> for AttendeeInfo {
    fn from(req: AttendeeRequest) -> Self {
        Self {
            attendee_name: req.attendee_name,
            guardian_name: req.guardian_name,
            phone: req.phone,
            email: req.email,
            notes: req.notes,
        }
    }
}

/// Public booking form; the workshop comes from the URL slug.
#[derive(Deserialize)]
pub struct PublicBookingRequest {
    pub date: String,
    pub time: String,
    #[serde(flatten)]
    pub attendee: AttendeeRequest,
}

#[derive(Deserialize)]
pub struct StaffBookingRequest {
    pub template_id: String,
    pub date: String,
    pub time: String,
    #[serde(flatten)]
    pub attendee: AttendeeRequest,
}

#[derive(Deserialize)]
pub struct PhoneQuery {
    pub phone: String,
}

#[derive(Deserialize)]
pub struct TransitionRequest {
    pub event: LifecycleEvent,
    /// Only read for `convert`.
    pub lead: Option<LeadFields>,
}

pub fn parse_date(raw: &str) -> Result<chrono::NaiveDate, crate::error::AppError> {
    chrono::NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| crate::error::AppError::Validation(format!("Invalid date '{}' (expected YYYY-MM-DD)", raw)))
}
