use axum::{extract::{State, Path}, http::StatusCode, response::IntoResponse, Json};
use crate::state::AppState;
use crate::api::dtos::requests::{parse_date, CreateTemplateRequest, RecurrenceRequest, SlotOverrideRequest, UpdateTemplateRequest};
use crate::domain::models::template::{parse_time_of_day, NewTemplateParams, Recurrence, WorkshopTemplate};
use crate::domain::services::scheduling::SlotOverride;
use crate::error::AppError;
use std::sync::Arc;
use tracing::info;

fn recurrence_from(req: &RecurrenceRequest) -> Result<Recurrence, AppError> {
    Recurrence::parse(&req.recurrence_type, req.weekdays.clone(), req.date.as_deref(), &req.time)
}

async fn load_template(state: &AppState, id: &str) -> Result<WorkshopTemplate, AppError> {
    state.template_repo.find_by_id(id).await?
        .ok_or(AppError::NotFound("Workshop not found".into()))
}

pub async fn create_template(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let template = WorkshopTemplate::new(NewTemplateParams {
        title: payload.title,
        description: payload.description,
        duration_min: payload.duration_min,
        recurrence: recurrence_from(&payload.recurrence)?,
        capacity_per_slot: payload.capacity_per_slot,
        is_active: payload.is_active.unwrap_or(true),
        target_audience: payload.target_audience,
    })?;

    let created = state.template_repo.create(&template).await?;
    info!("Workshop template {} created with slug {}", created.id, created.slug);
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn list_templates(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(state.template_repo.list().await?))
}

pub async fn get_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(load_template(&state, &id).await?))
}

/// Edits defaults only. Already materialized slots keep their own capacity and times.
pub async fn update_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<UpdateTemplateRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut template = load_template(&state, &id).await?;

    if let Some(title) = payload.title { template.title = title; }
    if let Some(description) = payload.description { template.description = description; }
    if let Some(duration_min) = payload.duration_min { template.duration_min = duration_min; }
    if let Some(capacity) = payload.capacity_per_slot { template.capacity_per_slot = capacity; }
    if let Some(is_active) = payload.is_active { template.is_active = is_active; }
    if let Some(audience) = payload.target_audience { template.target_audience = audience; }
    if let Some(recurrence) = &payload.recurrence {
        template.recurrence = recurrence_from(recurrence)?;
    }
    template.validate()?;

    let updated = state.template_repo.update(&template).await?;
    info!("Workshop template {} updated", updated.id);
    Ok(Json(updated))
}

pub async fn delete_template(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    state.template_repo.delete(&id).await?;
    info!("Workshop template {} deleted", id);
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_template_slots(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let template = load_template(&state, &id).await?;
    Ok(Json(state.slot_repo.list_by_template(&template.id).await?))
}

pub async fn override_slot(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<SlotOverrideRequest>,
) -> Result<impl IntoResponse, AppError> {
    let date = parse_date(&payload.date)?;
    let start_time = parse_time_of_day(&payload.time)?;
    let edit = SlotOverride { capacity: payload.capacity, cancelled: payload.cancelled };

    let slot = state.scheduling.override_slot(&id, date, start_time, edit).await?;
    Ok(Json(slot))
}
