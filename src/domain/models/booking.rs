use serde::{Deserialize, Serialize};
use uuid::Uuid;
use chrono::{DateTime, Utc};
use sqlx::FromRow;
use std::fmt;
use crate::domain::services::pipeline::normalize_phone;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookingStatus {
    #[serde(rename = "confirmed")]
    Confirmed,
    #[serde(rename = "reminder_sent")]
    ReminderSent,
    #[serde(rename = "attended")]
    Attended,
    #[serde(rename = "feedback_requested")]
    FeedbackRequested,
    #[serde(rename = "converted")]
    Converted,
    #[serde(rename = "cancelled")]
    Cancelled,
    #[serde(rename = "no-show")]
    NoShow,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 7] = [
        BookingStatus::Confirmed,
        BookingStatus::ReminderSent,
        BookingStatus::Attended,
        BookingStatus::FeedbackRequested,
        BookingStatus::Converted,
        BookingStatus::Cancelled,
        BookingStatus::NoShow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::ReminderSent => "reminder_sent",
            BookingStatus::Attended => "attended",
            BookingStatus::FeedbackRequested => "feedback_requested",
            BookingStatus::Converted => "converted",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::NoShow => "no-show",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BookingStatus::Converted | BookingStatus::Cancelled | BookingStatus::NoShow)
    }

    /// Whether the booking holds a seat. No-shows keep theirs.
    pub fn occupies_seat(&self) -> bool {
        !matches!(self, BookingStatus::Cancelled)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for BookingStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        BookingStatus::ALL
            .into_iter()
            .find(|s| s.as_str() == value)
            .ok_or_else(|| format!("unknown booking status '{}'", value))
    }
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Booking {
    pub id: String,
    pub workshop_slot_id: String,
    pub attendee_name: String,
    pub guardian_name: String,
    pub phone: String,
    #[serde(skip_serializing)]
    pub phone_digits: String,
    pub email: Option<String>,
    #[sqlx(try_from = "String")]
    pub status: BookingStatus,
    pub notes: Option<String>,
    pub payment_status: String,
    pub booked_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

pub struct AttendeeInfo {
    pub attendee_name: String,
    pub guardian_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub notes: Option<String>,
}

impl Booking {
    pub fn new(workshop_slot_id: String, attendee: AttendeeInfo) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            workshop_slot_id,
            phone_digits: normalize_phone(&attendee.phone),
            attendee_name: attendee.attendee_name,
            guardian_name: attendee.guardian_name,
            phone: attendee.phone,
            email: attendee.email,
            status: BookingStatus::Confirmed,
            notes: attendee.notes,
            payment_status: "unpaid".to_string(),
            booked_at: now,
            updated_at: now,
        }
    }
}

/// Compare-and-set request for a booking's status.
#[derive(Debug, Clone)]
pub struct StatusChange {
    pub booking_id: String,
    pub from: BookingStatus,
    pub to: BookingStatus,
}
