use axum::{extract::State, response::IntoResponse, Json};
use crate::background::run_pipeline_sweep;
use crate::state::AppState;
use crate::error::AppError;
use std::sync::Arc;

/// Runs the lead-promotion sweep immediately. CRM failures surface as 502.
pub async fn sync_pipeline(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, AppError> {
    Ok(Json(run_pipeline_sweep(&state).await?))
}
