use std::sync::Arc;
use chrono::Utc;
use serde_json::{json, Value};
use sha2::{Digest, Sha256};
use tera::{Context, Tera};
use tracing::info;
use uuid::Uuid;
use crate::domain::models::{booking::Booking, message::MessageLog, slot::WorkshopSlot, template::WorkshopTemplate};
use crate::domain::ports::{MessageChannel, MessageLogRepository};
use crate::error::AppError;

pub const KIND_REMINDER: &str = "reminder";
pub const KIND_FEEDBACK: &str = "feedback";

/// Loads the built-in message templates.
pub fn default_templates() -> Result<Tera, AppError> {
    let mut tera = Tera::default();
    tera.add_raw_template(KIND_REMINDER, include_str!("../../../templates/messages/reminder.txt"))
        .map_err(|e| AppError::InternalWithMsg(format!("Tera parse error: {:?}", e)))?;
    tera.add_raw_template(KIND_FEEDBACK, include_str!("../../../templates/messages/feedback.txt"))
        .map_err(|e| AppError::InternalWithMsg(format!("Tera parse error: {:?}", e)))?;
    Ok(tera)
}

pub fn message_context(booking: &Booking, slot: &WorkshopSlot, template: &WorkshopTemplate) -> Value {
    json!({
        "attendee_name": booking.attendee_name,
        "guardian_name": booking.guardian_name,
        "workshop_title": template.title,
        "date": slot.date.format("%Y-%m-%d").to_string(),
        "start_time": slot.start_time.format("%H:%M").to_string(),
        "end_time": slot.end_time.format("%H:%M").to_string(),
    })
}

/// Sends each lifecycle message at most once per (job, kind): a retried job
/// never resends, a new transition produces a new job and a new message.
pub struct MessageService {
    channel: Arc<dyn MessageChannel>,
    logs: Arc<dyn MessageLogRepository>,
    templates: Arc<Tera>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    SkippedDuplicate,
}

impl MessageService {
    pub fn new(channel: Arc<dyn MessageChannel>, logs: Arc<dyn MessageLogRepository>, templates: Arc<Tera>) -> Self {
        Self { channel, logs, templates }
    }

    pub fn render(&self, kind: &str, context_data: &Value) -> Result<String, AppError> {
        let context = Context::from_value(context_data.clone())
            .map_err(|e| AppError::InternalWithMsg(format!("Tera context error: {:?}", e)))?;
        let text = self.templates.render(kind, &context)
            .map_err(|e| AppError::InternalWithMsg(format!("Tera render error: {:?}", e)))?;
        Ok(text.trim().to_string())
    }

    pub async fn deliver_once(
        &self,
        job_id: &str,
        booking: &Booking,
        kind: &str,
        context_data: &Value,
    ) -> Result<Delivery, AppError> {
        let hash = delivery_hash(job_id, kind);

        if self.logs.has_message_been_sent(&booking.phone, kind, &hash).await? {
            info!("Message skipped (idempotency) for job {}. Booking: {}, Kind: {}", job_id, booking.id, kind);
            self.record(job_id, booking, kind, hash, "SKIPPED_DUPLICATE").await?;
            return Ok(Delivery::SkippedDuplicate);
        }

        let text = self.render(kind, context_data)?;
        self.channel.send_message(&booking.phone, &text).await?;
        info!("Sent {} message for booking {}", kind, booking.id);
        self.record(job_id, booking, kind, hash, "SENT").await?;
        Ok(Delivery::Sent)
    }

    async fn record(&self, job_id: &str, booking: &Booking, kind: &str, hash: String, status: &str) -> Result<(), AppError> {
        let log = MessageLog {
            id: Uuid::new_v4().to_string(),
            job_id: job_id.to_string(),
            booking_id: booking.id.clone(),
            recipient: booking.phone.clone(),
            kind: kind.to_string(),
            context_hash: hash,
            sent_at: Utc::now(),
            status: status.to_string(),
        };
        self.logs.log_message(&log).await
    }
}

fn delivery_hash(job_id: &str, kind: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(kind.as_bytes());
    hasher.update(job_id.as_bytes());
    hex::encode(hasher.finalize())
}
