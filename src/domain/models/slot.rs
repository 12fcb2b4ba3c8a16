use serde::{Deserialize, Serialize, Serializer};
use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;
use std::fmt;
use crate::domain::models::template::WorkshopTemplate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotStatus {
    Active,
    Cancelled,
}

impl SlotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SlotStatus::Active => "active",
            SlotStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for SlotStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for SlotStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "active" => Ok(SlotStatus::Active),
            "cancelled" => Ok(SlotStatus::Cancelled),
            other => Err(format!("unknown slot status '{}'", other)),
        }
    }
}

/// A persisted, bookable instance of a template.
#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct WorkshopSlot {
    pub id: String,
    pub workshop_template_id: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(serialize_with = "hh_mm")]
    pub end_time: NaiveTime,
    pub capacity: i32,
    #[sqlx(try_from = "String")]
    pub status: SlotStatus,
    pub seats_taken: i32,
    pub created_at: DateTime<Utc>,
}

impl WorkshopSlot {
    /// Materializes an occurrence with the template's current defaults.
    /// `end_time` is fixed here and never recomputed.
    pub fn from_template(template: &WorkshopTemplate, date: NaiveDate, start_time: NaiveTime) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            workshop_template_id: template.id.clone(),
            date,
            start_time,
            end_time: template.end_time(start_time),
            capacity: template.capacity_per_slot,
            status: SlotStatus::Active,
            seats_taken: 0,
            created_at: Utc::now(),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.status == SlotStatus::Cancelled
    }
}

/// Computed projection of one occurrence; never stored.
#[derive(Debug, Serialize, Clone, PartialEq, Eq)]
pub struct VirtualSlot {
    pub template_id: String,
    pub template_title: String,
    pub date: NaiveDate,
    #[serde(serialize_with = "hh_mm")]
    pub start_time: NaiveTime,
    #[serde(serialize_with = "hh_mm")]
    pub end_time: NaiveTime,
    pub capacity: i32,
    pub booked_count: i64,
    pub slot_id: Option<String>,
}

impl VirtualSlot {
    pub fn remaining(&self) -> i64 {
        (self.capacity as i64 - self.booked_count).max(0)
    }
}

fn hh_mm<S: Serializer>(time: &NaiveTime, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(&time.format("%H:%M").to_string())
}
