use axum::{extract::{State, Path, Query}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{parse_date, PhoneQuery, PublicBookingRequest, StaffBookingRequest, TransitionRequest};
use crate::domain::models::template::parse_time_of_day;
use crate::domain::services::scheduling::{SlotQuery, TemplateRef};
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

pub async fn book_workshop(
    State(state): State<Arc<AppState>>,
    Path(slug): Path<String>,
    Json(payload): Json<PublicBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    info!("book_workshop: slug {} on {} {}", slug, payload.date, payload.time);

    let query = SlotQuery {
        template: TemplateRef::Slug(slug),
        date: parse_date(&payload.date)?,
        start_time: parse_time_of_day(&payload.time)?,
    };
    let booking = state.scheduling.reserve_seat(query, payload.attendee.into()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn create_booking(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<StaffBookingRequest>,
) -> Result<impl IntoResponse, AppError> {
    let query = SlotQuery {
        template: TemplateRef::Id(payload.template_id),
        date: parse_date(&payload.date)?,
        start_time: parse_time_of_day(&payload.time)?,
    };
    let booking = state.scheduling.reserve_seat(query, payload.attendee.into()).await?;
    Ok((StatusCode::CREATED, Json(booking)))
}

pub async fn list_bookings(
    State(state): State<Arc<AppState>>,
    Query(query): Query<PhoneQuery>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.scheduling.list_bookings_for_phone(&query.phone).await?))
}

pub async fn get_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.scheduling.find_booking(&booking_id).await?))
}

pub async fn transition_booking(
    State(state): State<Arc<AppState>>,
    Path(booking_id): Path<String>,
    Json(payload): Json<TransitionRequest>,
) -> Result<impl IntoResponse, AppError> {
    let booking = state.scheduling
        .transition_booking(&booking_id, payload.event, payload.lead)
        .await?;
    Ok(Json(booking))
}
