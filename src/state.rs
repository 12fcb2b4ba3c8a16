use std::sync::Arc;
use crate::domain::ports::{
    BookingRepository, JobRepository, LeadStore, MessageChannel, MessageLogRepository,
    SlotRepository, TemplateRepository,
};
use crate::domain::services::{
    messaging::{default_templates, MessageService},
    pipeline::PipelineService,
    retry::RetryPolicy,
    scheduling::SchedulingService,
};
use crate::config::Config;
use crate::error::AppError;

/// Storage adapters for one backend.
pub struct Repositories {
    pub templates: Arc<dyn TemplateRepository>,
    pub slots: Arc<dyn SlotRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub jobs: Arc<dyn JobRepository>,
    pub message_logs: Arc<dyn MessageLogRepository>,
}

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub template_repo: Arc<dyn TemplateRepository>,
    pub slot_repo: Arc<dyn SlotRepository>,
    pub booking_repo: Arc<dyn BookingRepository>,
    pub job_repo: Arc<dyn JobRepository>,
    pub message_log_repo: Arc<dyn MessageLogRepository>,
    pub message_channel: Arc<dyn MessageChannel>,
    pub lead_store: Arc<dyn LeadStore>,
    pub scheduling: Arc<SchedulingService>,
    pub pipeline: Arc<PipelineService>,
    pub messages: Arc<MessageService>,
    pub retry_policy: RetryPolicy,
}

impl AppState {
    pub fn new(
        config: Config,
        repos: Repositories,
        message_channel: Arc<dyn MessageChannel>,
        lead_store: Arc<dyn LeadStore>,
    ) -> Result<Self, AppError> {
        let scheduling = Arc::new(SchedulingService::new(
            repos.templates.clone(),
            repos.slots.clone(),
            repos.bookings.clone(),
            config.timezone,
            config.reminder_lead_hours,
        ));
        let pipeline = Arc::new(PipelineService::new(lead_store.clone(), repos.bookings.clone()));
        let messages = Arc::new(MessageService::new(
            message_channel.clone(),
            repos.message_logs.clone(),
            Arc::new(default_templates()?),
        ));

        Ok(Self {
            retry_policy: RetryPolicy::with_max_attempts(config.job_max_attempts),
            config,
            template_repo: repos.templates,
            slot_repo: repos.slots,
            booking_repo: repos.bookings,
            job_repo: repos.jobs,
            message_log_repo: repos.message_logs,
            message_channel,
            lead_store,
            scheduling,
            pipeline,
            messages,
        })
    }
}
