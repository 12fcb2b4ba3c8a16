use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::FromRow;
use uuid::Uuid;
use crate::domain::models::lead::LeadFields;

pub const JOB_REMINDER_MESSAGE: &str = "REMINDER_MESSAGE";
pub const JOB_FEEDBACK_MESSAGE: &str = "FEEDBACK_MESSAGE";
pub const JOB_AUTO_REMINDER: &str = "AUTO_REMINDER";
pub const JOB_PIPELINE_PROMOTE: &str = "PIPELINE_PROMOTE";
pub const JOB_LEAD_CONVERT: &str = "LEAD_CONVERT";

/// A PROCESSING job whose claim is older than this is assumed orphaned by a
/// dead worker and is claimed again.
pub const CLAIM_LEASE_MINUTES: i64 = 10;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct JobPayload {
    pub booking_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lead_fields: Option<LeadFields>,
}

#[derive(Debug, Serialize, Deserialize, FromRow, Clone)]
pub struct Job {
    pub id: String,
    pub job_type: String,
    pub payload: Json<JobPayload>,
    pub execute_at: DateTime<Utc>,
    pub status: String,
    pub attempts: i32,
    pub error_message: Option<String>,
    pub claimed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl Job {
    pub fn new(job_type: &str, booking_id: String, execute_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            job_type: job_type.to_string(),
            payload: Json(JobPayload { booking_id, lead_fields: None }),
            execute_at,
            status: "PENDING".to_string(),
            attempts: 0,
            error_message: None,
            claimed_at: None,
            created_at: Utc::now(),
        }
    }

    pub fn lead_convert(booking_id: String, fields: LeadFields) -> Self {
        let mut job = Self::new(JOB_LEAD_CONVERT, booking_id, Utc::now());
        job.payload.0.lead_fields = Some(fields);
        job
    }
}
