use axum::{extract::{State, Path, Query}, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{parse_date, SlotsQuery};
use crate::api::dtos::responses::{SlotView, SlotsResponse};
use crate::error::AppError;
use std::sync::Arc;

const DEFAULT_WINDOW_DAYS: u32 = 14;

pub async fn list_slots(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SlotsQuery>,
) -> Result<impl IntoResponse, AppError> {
    let from = match &query.from {
        Some(raw) => parse_date(raw)?,
        None => state.scheduling.today(),
    };
    let days = query.days.unwrap_or(DEFAULT_WINDOW_DAYS);

    let slots = state.scheduling.list_virtual_slots(from, days, query.future_only).await?;
    Ok(Json(SlotsResponse {
        from,
        days,
        slots: slots.into_iter().map(SlotView::from).collect(),
    }))
}

pub async fn list_slot_bookings(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.scheduling.list_bookings_for_slot(&slot_id).await?))
}

pub async fn slot_occupancy(
    State(state): State<Arc<AppState>>,
    Path(slot_id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.scheduling.availability(&slot_id).await?))
}
