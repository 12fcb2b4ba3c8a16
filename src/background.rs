use std::sync::Arc;
use std::time::{Duration, Instant};
use chrono::Utc;
use tokio::time::sleep;
use tracing::{error, info, warn, info_span, Instrument};
use crate::state::AppState;
use crate::domain::models::{
    booking::{Booking, BookingStatus},
    job::{Job, JOB_AUTO_REMINDER, JOB_FEEDBACK_MESSAGE, JOB_LEAD_CONVERT, JOB_PIPELINE_PROMOTE, JOB_REMINDER_MESSAGE},
};
use crate::domain::services::lifecycle::LifecycleEvent;
use crate::domain::services::messaging::{message_context, KIND_FEEDBACK, KIND_REMINDER};
use crate::domain::services::pipeline::SweepReport;
use crate::error::AppError;

const BATCH_SIZE: i32 = 10;

pub async fn start_background_worker(state: Arc<AppState>) {
    info!("Starting background job worker...");

    let sweep_every = Duration::from_secs(state.config.pipeline_sweep_secs.max(1));
    let mut last_sweep = Instant::now();

    loop {
        run_due_jobs(&state, BATCH_SIZE).await;

        if last_sweep.elapsed() >= sweep_every {
            last_sweep = Instant::now();
            if let Err(e) = run_pipeline_sweep(&state).await {
                warn!("Pipeline sweep deferred: {}", e);
            }
        }

        sleep(Duration::from_secs(5)).await;
    }
}

/// Claims and processes up to `limit` due jobs. Returns how many were claimed.
pub async fn run_due_jobs(state: &AppState, limit: i32) -> usize {
    let jobs = match state.job_repo.find_pending(limit).await {
        Ok(jobs) => jobs,
        Err(e) => {
            error!("Failed to fetch pending jobs: {:?}", e);
            return 0;
        }
    };

    let claimed = jobs.len();
    for job in jobs {
        let span = info_span!(
            "background_job",
            job_id = %job.id,
            job_type = %job.job_type,
            booking_id = %job.payload.booking_id,
        );

        async {
            info!("Processing job: {}", job.job_type);
            let result = process_job(state, &job).await;
            settle(state, &job, result).await;
        }
            .instrument(span)
            .await;
    }
    claimed
}

pub async fn run_pipeline_sweep(state: &AppState) -> Result<SweepReport, AppError> {
    let span = info_span!("pipeline_sweep");
    state.pipeline.sweep().instrument(span).await
}

async fn settle(state: &AppState, job: &Job, result: Result<(), AppError>) {
    let outcome = match result {
        Ok(()) => {
            info!("Job completed successfully");
            state.job_repo.update_status(&job.id, "COMPLETED", None).await
        }
        Err(e) if e.is_retryable() && state.retry_policy.should_retry(job.attempts + 1) => {
            let attempts = job.attempts + 1;
            let delay = state.retry_policy.delay_for_attempt(attempts);
            warn!("Job attempt {} deferred: {}. Retrying in {:?}", attempts, e, delay);
            let execute_at = Utc::now() + chrono::Duration::from_std(delay).unwrap_or(chrono::Duration::hours(1));
            state.job_repo.reschedule(&job.id, execute_at, attempts, e.to_string()).await
        }
        Err(e) => {
            error!("Job failed after {} attempts: {}", job.attempts + 1, e);
            state.job_repo.update_status(&job.id, "FAILED", Some(e.to_string())).await
        }
    };

    if let Err(e) = outcome {
        error!("Failed to record job outcome: {:?}", e);
    }
}

async fn process_job(state: &AppState, job: &Job) -> Result<(), AppError> {
    let booking = state.booking_repo.find_by_id(&job.payload.booking_id).await?
        .ok_or(AppError::NotFound(format!("Booking {} not found", job.payload.booking_id)))?;

    match job.job_type.as_str() {
        JOB_REMINDER_MESSAGE => send_lifecycle_message(state, job, &booking, KIND_REMINDER).await,
        JOB_FEEDBACK_MESSAGE => send_lifecycle_message(state, job, &booking, KIND_FEEDBACK).await,
        JOB_AUTO_REMINDER => auto_remind(state, &booking).await,
        JOB_PIPELINE_PROMOTE => {
            state.pipeline.promote_for_booking(&booking).await?;
            Ok(())
        }
        JOB_LEAD_CONVERT => {
            let fields = job.payload.lead_fields.clone().unwrap_or_default();
            state.pipeline.convert(&booking, &fields).await?;
            Ok(())
        }
        other => Err(AppError::InternalWithMsg(format!("Unknown job type {}", other))),
    }
}

async fn send_lifecycle_message(state: &AppState, job: &Job, booking: &Booking, kind: &str) -> Result<(), AppError> {
    let slot = state.slot_repo.find_by_id(&booking.workshop_slot_id).await?
        .ok_or(AppError::NotFound(format!("Slot {} not found", booking.workshop_slot_id)))?;
    let template = state.template_repo.find_by_id(&slot.workshop_template_id).await?
        .ok_or(AppError::NotFound(format!("Workshop {} not found", slot.workshop_template_id)))?;

    let context = message_context(booking, &slot, &template);
    state.messages.deliver_once(&job.id, booking, kind, &context).await?;
    Ok(())
}

/// Applies `send_reminder` to a still-confirmed booking; anything else is left alone.
async fn auto_remind(state: &AppState, booking: &Booking) -> Result<(), AppError> {
    if booking.status != BookingStatus::Confirmed {
        info!("Automatic reminder skipped: booking {} is {}", booking.id, booking.status);
        return Ok(());
    }
    match state.scheduling.transition_booking(&booking.id, LifecycleEvent::SendReminder, None).await {
        Ok(_) => Ok(()),
        Err(AppError::InvalidTransition { from, .. }) => {
            info!("Automatic reminder skipped: booking {} moved to {}", booking.id, from);
            Ok(())
        }
        Err(e) => Err(e),
    }
}
