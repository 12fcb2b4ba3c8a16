use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{error, warn};
use crate::domain::models::booking::BookingStatus;
use crate::domain::services::lifecycle::LifecycleEvent;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("Resource not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Invalid input: {0}")]
    Validation(String),
    #[error("Slot {slot_id} is full ({capacity} seats)")]
    CapacityExceeded { slot_id: String, capacity: i32 },
    #[error("Cannot {event} a booking in status {from}")]
    InvalidTransition { from: BookingStatus, event: LifecycleEvent },
    #[error("Side effect deferred: {0}")]
    SyncDeferred(String),
    #[error("Internal server error")]
    Internal,
    #[error("Internal server error: {0}")]
    InternalWithMsg(String),
}

impl AppError {
    /// Failures of an outbound call that a later attempt may fix.
    pub fn is_retryable(&self) -> bool {
        matches!(self, AppError::SyncDeferred(_) | AppError::Database(_))
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match &self {
            AppError::Database(e) => {
                if let Some(db_err) = e.as_database_error() {
                    let code = db_err.code().unwrap_or_default();

                    // 2067 = SQLite Unique Constraint
                    // 23505 = PostgreSQL Unique Violation
                    if code == "2067" || code == "23505" {
                        return (
                            StatusCode::CONFLICT,
                            Json(json!({ "error": "Resource already exists (duplicate entry)", "code": "conflict" }))
                        ).into_response();
                    }
                }

                error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal server error", "code": "internal" }))
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({ "error": msg, "code": "not_found" })),
            AppError::Conflict(msg) => (StatusCode::CONFLICT, json!({ "error": msg, "code": "conflict" })),
            AppError::Validation(msg) => (StatusCode::BAD_REQUEST, json!({ "error": msg, "code": "validation" })),
            AppError::CapacityExceeded { slot_id, capacity } => {
                warn!("Admission denied: slot {} is full", slot_id);
                (StatusCode::CONFLICT, json!({
                    "error": self.to_string(),
                    "code": "capacity_exceeded",
                    "slot_id": slot_id,
                    "capacity": capacity,
                    "remaining": 0
                }))
            }
            AppError::InvalidTransition { from, event } => (StatusCode::CONFLICT, json!({
                "error": self.to_string(),
                "code": "invalid_transition",
                "status": from,
                "event": event
            })),
            AppError::SyncDeferred(msg) => (StatusCode::BAD_GATEWAY, json!({ "error": msg, "code": "sync_deferred" })),
            AppError::Internal => (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error", "code": "internal" })),
            AppError::InternalWithMsg(msg) => {
                error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, json!({ "error": "Internal error", "code": "internal" }))
            }
        };

        (status, Json(body)).into_response()
    }
}
